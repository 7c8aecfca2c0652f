//! Roster quality metrics (KPIs).
//!
//! Computes staffing and workload indicators from a finished schedule and
//! the model it was generated for.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Coverage rate | Filled slots / required slots |
//! | Understaffed cells | (date, shift, role) triples below requirement |
//! | Shift counts | Assignments per staff member, total and per shift |
//! | Total spread | Largest max-min gap of totals within a role |
//! | Type spread | Largest max-min gap of per-shift counts within a role |
//! | Longest streaks | Longest run of working days / night shifts |

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{ConstraintLimits, ConstraintModel, Role, Schedule};

/// Roster performance indicators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleKpi {
    /// Required headcount across the month.
    pub required_slots: u64,
    /// Required headcount actually filled (excess staff not counted).
    pub filled_slots: u64,
    /// `filled_slots / required_slots` (1.0 when nothing is required).
    pub coverage_rate: f64,
    /// Number of (date, shift, role) triples below requirement.
    pub understaffed_cells: usize,
    /// Assignments per staff id.
    pub shifts_by_staff: HashMap<String, u32>,
    /// Assignments per staff id and shift name.
    pub shifts_by_staff_and_type: HashMap<String, HashMap<String, u32>>,
    /// Largest within-role spread of totals.
    pub total_spread: u32,
    /// Largest within-role spread of any per-shift count.
    pub max_type_spread: u32,
    /// Longest run of consecutive working days of any staff member.
    pub longest_working_streak: u32,
    /// Longest run of consecutive night shifts of any staff member.
    pub longest_night_streak: u32,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and its model.
    ///
    /// Staff ids, dates and shift names unknown to the model are ignored.
    pub fn calculate(schedule: &Schedule, model: &ConstraintModel) -> Self {
        let n_staff = model.n_staff();
        let n_shifts = model.n_shifts();
        let mut required_slots = 0u64;
        let mut filled_slots = 0u64;
        let mut understaffed_cells = 0usize;
        // [staff * n_shifts + shift]
        let mut counts = vec![0u32; n_staff * n_shifts];
        let mut run = vec![0u32; n_staff];
        let mut night_run = vec![0u32; n_staff];
        let mut longest_working_streak = 0;
        let mut longest_night_streak = 0;

        for (day, date) in model.calendar.dates.iter().enumerate() {
            let mut worked: Vec<Option<usize>> = vec![None; n_staff];
            for (shift, def) in model.shifts.iter().enumerate() {
                let staff: Vec<usize> = schedule
                    .staff_on(*date, &def.name)
                    .iter()
                    .filter_map(|id| model.staff_index(id))
                    .collect();
                for &s in &staff {
                    counts[s * n_shifts + shift] += 1;
                    worked[s].get_or_insert(shift);
                }

                let required = model.requirement(day, shift);
                for role in Role::ALL {
                    let want = required.for_role(role);
                    let have = staff.iter().filter(|&&s| model.role(s) == role).count() as u32;
                    required_slots += u64::from(want);
                    filled_slots += u64::from(have.min(want));
                    if have < want {
                        understaffed_cells += 1;
                    }
                }
            }

            for s in 0..n_staff {
                match worked[s] {
                    Some(shift) => {
                        run[s] += 1;
                        night_run[s] = if model.is_night(shift) {
                            night_run[s] + 1
                        } else {
                            0
                        };
                    }
                    None => {
                        run[s] = 0;
                        night_run[s] = 0;
                    }
                }
                longest_working_streak = longest_working_streak.max(run[s]);
                longest_night_streak = longest_night_streak.max(night_run[s]);
            }
        }

        let total = |s: usize| -> u32 { counts[s * n_shifts..(s + 1) * n_shifts].iter().sum() };
        let mut total_spread = 0;
        let mut max_type_spread = 0;
        for role in Role::ALL {
            let members: Vec<usize> = (0..n_staff)
                .filter(|&s| model.role(s) == role && !model.is_absent_all_month(s))
                .collect();
            total_spread = total_spread.max(spread(members.iter().map(|&s| total(s))));
            for shift in 0..n_shifts {
                max_type_spread = max_type_spread
                    .max(spread(members.iter().map(|&s| counts[s * n_shifts + shift])));
            }
        }

        let mut shifts_by_staff = HashMap::new();
        let mut shifts_by_staff_and_type = HashMap::new();
        for (s, member) in model.staff.iter().enumerate() {
            shifts_by_staff.insert(member.id.clone(), total(s));
            let per_type: HashMap<String, u32> = model
                .shifts
                .iter()
                .enumerate()
                .map(|(k, def)| (def.name.clone(), counts[s * n_shifts + k]))
                .collect();
            shifts_by_staff_and_type.insert(member.id.clone(), per_type);
        }

        let coverage_rate = if required_slots == 0 {
            1.0
        } else {
            filled_slots as f64 / required_slots as f64
        };

        Self {
            required_slots,
            filled_slots,
            coverage_rate,
            understaffed_cells,
            shifts_by_staff,
            shifts_by_staff_and_type,
            total_spread,
            max_type_spread,
            longest_working_streak,
            longest_night_streak,
        }
    }

    /// Whether streaks and spreads are within the given limits.
    pub fn meets_limits(&self, limits: &ConstraintLimits) -> bool {
        self.longest_working_streak <= limits.max_consecutive_shifts
            && self.longest_night_streak <= limits.max_night_shifts
            && self.total_spread <= limits.max_shift_diff
            && self.max_type_spread <= limits.max_shift_diff_per_type
    }
}

fn spread(values: impl Iterator<Item = u32>) -> u32 {
    let (low, high) = values.fold((u32::MAX, 0), |(lo, hi), v| (lo.min(v), hi.max(v)));
    high.saturating_sub(low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationRequest, ShiftInput, StaffMember};
    use crate::validation::validate_request;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, day).unwrap()
    }

    fn model() -> ConstraintModel {
        let req = GenerationRequest::new("W", 2025, 2)
            .with_staff(StaffMember::nurse("n1"))
            .with_staff(StaffMember::nurse("n2"))
            .with_staff(StaffMember::assistant("a1"))
            .with_shift(ShiftInput::new("day", "07:00", "19:00", 1, 1))
            .with_shift(ShiftInput::new("night", "19:00", "07:00", 1, 0));
        validate_request(&req).unwrap()
    }

    #[test]
    fn test_kpi_empty() {
        let m = model();
        let schedule = Schedule::empty(&m.calendar.dates, &m.shift_names());
        let kpi = ScheduleKpi::calculate(&schedule, &m);
        assert_eq!(kpi.required_slots, 28 * 3);
        assert_eq!(kpi.filled_slots, 0);
        assert_eq!(kpi.understaffed_cells, 28 * 3);
        assert!(kpi.coverage_rate.abs() < 1e-10);
        assert_eq!(kpi.shifts_by_staff["n1"], 0);
        assert_eq!(kpi.longest_working_streak, 0);
    }

    #[test]
    fn test_kpi_counts_and_streaks() {
        let m = model();
        let mut schedule = Schedule::empty(&m.calendar.dates, &m.shift_names());
        for day in 1..=3 {
            schedule.assign(d(day), "night", "n1");
        }
        schedule.assign(d(4), "day", "n1");
        schedule.assign(d(1), "day", "n2");
        schedule.assign(d(1), "day", "a1");
        schedule.assign(d(1), "day", "ghost");

        let kpi = ScheduleKpi::calculate(&schedule, &m);
        assert_eq!(kpi.filled_slots, 6);
        assert_eq!(kpi.shifts_by_staff["n1"], 4);
        assert_eq!(kpi.shifts_by_staff_and_type["n1"]["night"], 3);
        assert_eq!(kpi.shifts_by_staff_and_type["n2"]["day"], 1);
        assert_eq!(kpi.longest_working_streak, 4);
        assert_eq!(kpi.longest_night_streak, 3);
        assert_eq!(kpi.total_spread, 3);
        assert_eq!(kpi.max_type_spread, 3);
        assert!(!kpi.meets_limits(&ConstraintLimits::default()));
    }

    #[test]
    fn test_kpi_overstaffing_not_counted_as_filled() {
        let m = model();
        let mut schedule = Schedule::empty(&m.calendar.dates, &m.shift_names());
        schedule.assign(d(1), "night", "n1");
        schedule.assign(d(1), "night", "n2");
        let kpi = ScheduleKpi::calculate(&schedule, &m);
        assert_eq!(kpi.filled_slots, 1);
        assert_eq!(kpi.total_spread, 0);
    }
}
