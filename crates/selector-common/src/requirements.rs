use crate::model::{ProgramReq, Requirement};
use crate::weights::CategoryWeights;

/// Programs tagged with any of the selected categories. Everything when the
/// selection is empty.
pub fn programs_in_categories<'a>(
    programs: &'a [ProgramReq],
    weights: &CategoryWeights,
) -> Vec<&'a ProgramReq> {
    if weights.is_empty() {
        return programs.iter().collect();
    }
    programs
        .iter()
        .filter(|p| weights.selected().iter().any(|c| p.belongs_to(c)))
        .collect()
}

/// The programs whose ids were picked, in catalogue order.
pub fn selected_programs<'a>(programs: &'a [ProgramReq], ids: &[i64]) -> Vec<&'a ProgramReq> {
    programs.iter().filter(|p| ids.contains(&p.id)).collect()
}

/// Hardware target for the current selection.
///
/// Explicit titles win: each resource takes the most demanding recommended
/// value. Without titles, every selected category contributes the average
/// recommended values of `pool` scaled by its weight fraction.
pub fn aggregate(
    titles: &[&ProgramReq],
    weights: &CategoryWeights,
    pool: &[&ProgramReq],
) -> Requirement {
    if !titles.is_empty() {
        return titles.iter().fold(Requirement::default(), |acc, p| {
            let rec = p.recommended();
            Requirement {
                cpu: acc.cpu.max(rec.cpu),
                ram: acc.ram.max(rec.ram),
                gpu: acc.gpu.max(rec.gpu),
            }
        });
    }

    let mut out = Requirement::default();
    if weights.is_empty() || pool.is_empty() {
        return out;
    }

    let avg = average_recommended(pool);
    for (id, _) in weights.iter() {
        let w = weights.fraction(id);
        out.cpu += avg.cpu * w;
        out.ram += avg.ram * w;
        out.gpu += avg.gpu * w;
    }
    out
}

fn average_recommended(pool: &[&ProgramReq]) -> Requirement {
    let sum = pool.iter().fold(Requirement::default(), |acc, p| {
        let rec = p.recommended();
        Requirement {
            cpu: acc.cpu + rec.cpu,
            ram: acc.ram + rec.ram,
            gpu: acc.gpu + rec.gpu,
        }
    });
    let n = pool.len().max(1) as f64;
    Requirement {
        cpu: sum.cpu / n,
        ram: sum.ram / n,
        gpu: sum.gpu / n,
    }
}
