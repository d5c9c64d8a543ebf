//! Twice-daily refresh loop for `fplsnap watch`.

use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};
use tracing::{error, info};

/// The first slot strictly after `now`, wrapping to the next day.
///
/// `times` must be non-empty; config validation guarantees that.
pub fn next_run_after(now: DateTime<Utc>, times: &[NaiveTime]) -> DateTime<Utc> {
    let today = now.date_naive();
    let mut sorted = times.to_vec();
    sorted.sort();

    if let Some(t) = sorted.iter().find(|t| today.and_time(**t).and_utc() > now) {
        return today.and_time(*t).and_utc();
    }
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    let first = sorted.first().copied().unwrap_or(NaiveTime::MIN);
    tomorrow.and_time(first).and_utc()
}

/// Run `job` at every slot. A failed run is logged and the loop waits for
/// the next slot. Stops after `max_runs` jobs when set.
pub fn watch_loop<E: std::fmt::Display>(
    times: &[NaiveTime],
    run_now: bool,
    max_runs: Option<usize>,
    mut job: impl FnMut() -> Result<(), E>,
    now: impl Fn() -> DateTime<Utc>,
    mut sleep: impl FnMut(Duration),
) -> usize {
    let mut runs = 0;
    let mut attempt = |runs: &mut usize| {
        *runs += 1;
        if let Err(e) = job() {
            error!(error = %e, "scheduled run failed; waiting for the next slot");
        }
    };

    if run_now {
        attempt(&mut runs);
    }

    while max_runs.map_or(true, |max| runs < max) {
        let current = now();
        let next = next_run_after(current, times);
        let wait = (next - current).to_std().unwrap_or(Duration::ZERO);
        info!(next_run = %next.to_rfc3339(), wait_secs = wait.as_secs(), "waiting for next slot");
        sleep(wait);
        attempt(&mut runs);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::{Cell, RefCell};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, d, h, m, 0).unwrap()
    }

    #[test]
    fn next_slot_same_day() {
        let times = [hm(5, 0), hm(17, 0)];
        assert_eq!(next_run_after(at(20, 3, 0), &times), at(20, 5, 0));
        assert_eq!(next_run_after(at(20, 5, 0), &times), at(20, 17, 0));
        assert_eq!(next_run_after(at(20, 12, 30), &times), at(20, 17, 0));
    }

    #[test]
    fn next_slot_wraps_to_tomorrow() {
        let times = [hm(17, 0), hm(5, 0)];
        assert_eq!(next_run_after(at(20, 17, 0), &times), at(21, 5, 0));
        assert_eq!(next_run_after(at(31, 23, 59), &times), Utc.with_ymd_and_hms(2025, 9, 1, 5, 0, 0).unwrap());
    }

    #[test]
    fn loop_runs_at_each_slot_and_survives_failures() {
        let clock = Cell::new(at(20, 4, 0));
        let calls = RefCell::new(Vec::new());
        let runs = watch_loop(
            &[hm(5, 0), hm(17, 0)],
            true,
            Some(3),
            || {
                calls.borrow_mut().push(clock.get());
                if calls.borrow().len() == 2 {
                    return Err("upstream down");
                }
                Ok(())
            },
            || clock.get(),
            |d| clock.set(clock.get() + chrono::Duration::from_std(d).unwrap()),
        );
        assert_eq!(runs, 3);
        assert_eq!(*calls.borrow(), vec![at(20, 4, 0), at(20, 5, 0), at(20, 17, 0)]);
    }
}
