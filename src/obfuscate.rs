use crate::schema::{ResolvedBalance, UnifiedRecord};
use log::info;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

pub const MAX_NOISE: f64 = 0.25;

/// Unit code reported for obfuscated runs.
pub const MASKED_UNIT: &str = "000000";

/// Replaces the IKZ digits (positions 5..11) with zeros.
pub fn mask_psp(psp: &str) -> String {
    let head: String = psp.chars().take(5).collect();
    let tail: String = psp.chars().skip(11).collect();
    format!("{}{}{}", head, MASKED_UNIT, tail)
}

pub fn mask_name(name: &str) -> String {
    "x".repeat(name.chars().count())
}

struct Noise<'a, R: Rng> {
    rng: &'a mut R,
    factor: Uniform<f64>,
}

impl<R: Rng> Noise<'_, R> {
    fn apply(&mut self, value: f64) -> f64 {
        value * (1.0 + self.factor.sample(&mut *self.rng))
    }

    fn apply_opt(&mut self, value: Option<f64>) -> Option<f64> {
        value.map(|v| self.apply(v))
    }
}

/// Turns a real consolidation result into a shareable fixture: every amount gets
/// independent uniform noise of up to ±25 % and identifiers are masked. Row count,
/// column layout and all other text columns are left as they are.
pub fn obfuscate_records<R: Rng>(records: &[UnifiedRecord], rng: &mut R) -> Vec<UnifiedRecord> {
    let mut noise = Noise {
        rng,
        factor: Uniform::new_inclusive(-MAX_NOISE, MAX_NOISE),
    };

    let obfuscated: Vec<UnifiedRecord> = records
        .iter()
        .map(|record| {
            let mut out = record.clone();
            out.psp = mask_psp(&record.psp);
            out.name = mask_name(&record.name);

            if let Some(plan) = out.plan.as_mut() {
                plan.carryover = noise.apply(plan.carryover);
                plan.original_budget = noise.apply(plan.original_budget);
                plan.other_allocations = noise.apply(plan.other_allocations);
                plan.commitments = noise.apply(plan.commitments);
            }
            if let Some(turnover) = out.turnover.as_mut() {
                turnover.income_ila = noise.apply(turnover.income_ila);
                turnover.income_actual = noise.apply(turnover.income_actual);
                turnover.own_and_industry_shares = noise.apply(turnover.own_and_industry_shares);
                turnover.expenditure_actual = noise.apply(turnover.expenditure_actual);
                turnover.year_balance = noise.apply(turnover.year_balance);
            }
            out.end_balance_turnover = noise.apply_opt(record.end_balance_turnover);
            out.end_balance_budget = noise.apply_opt(record.end_balance_budget);
            out.balance = match record.balance {
                ResolvedBalance::Turnover(v) => ResolvedBalance::Turnover(noise.apply(v)),
                ResolvedBalance::Budget(v) => ResolvedBalance::Budget(noise.apply(v)),
            };
            out
        })
        .collect();

    info!("Obfuscated {} records", obfuscated.len());
    obfuscated
}
