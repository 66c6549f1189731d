use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::io::prelude::*;

use nom::{
    character::complete::{self, char},
    multi::separated_list1,
    IResult,
};
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

const TIMER_STATES: usize = 9;
const RESET_TIMER: usize = 6;
const SPAWN_TIMER: usize = 8;
const MAX_INPUT_LEN: usize = 4096;
const SIMULATION_DAYS: usize = 256;

// Bucket i holds the number of individuals with i days left on their
// timer.  The sum of all buckets is the population.
type Histogram = [u64; TIMER_STATES];

#[derive(Debug, PartialEq, Eq)]
enum SimulationError {
    InvalidInput(String),
    InputTooLarge,
    Overflow,
}

impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidInput(msg) => {
                write!(f, "invalid input: {}", msg)
            }
            SimulationError::InputTooLarge => {
                write!(f, "input exceeds {} bytes", MAX_INPUT_LEN)
            }
            SimulationError::Overflow => {
                write!(f, "population no longer fits in a 64-bit counter")
            }
        }
    }
}

impl Error for SimulationError {}

fn timer_list(input: &str) -> IResult<&str, Vec<u64>> {
    separated_list1(char(','), complete::u64)(input)
}

fn parse_timers(input: &str) -> Result<Histogram, SimulationError> {
    if input.len() > MAX_INPUT_LEN {
        return Err(SimulationError::InputTooLarge);
    }
    let line = input.strip_suffix('\n').unwrap_or(input);
    let timers = match timer_list(line) {
        Ok((unparsed, timers)) => {
            if unparsed.is_empty() {
                timers
            } else {
                return Err(SimulationError::InvalidInput(format!(
                    "unexpected trailing junk: '{}'",
                    unparsed
                )));
            }
        }
        Err(e) => {
            return Err(SimulationError::InvalidInput(format!(
                "failed to parse '{}': {}",
                line, e
            )));
        }
    };
    let mut histogram: Histogram = [0; TIMER_STATES];
    for timer in timers {
        let bucket = usize::try_from(timer)
            .ok()
            .and_then(|i| histogram.get_mut(i));
        match bucket {
            Some(count) => {
                *count += 1;
            }
            None => {
                return Err(SimulationError::InvalidInput(format!(
                    "timer {} is outside the range 0-{}",
                    timer,
                    TIMER_STATES - 1
                )));
            }
        }
    }
    Ok(histogram)
}

#[test]
fn test_parse_timers() {
    assert_eq!(parse_timers("3,4,3,1,2"), Ok([0, 1, 1, 2, 1, 0, 0, 0, 0]));
    assert_eq!(parse_timers("3,4,3,1,2\n"), Ok([0, 1, 1, 2, 1, 0, 0, 0, 0]));
    assert_eq!(parse_timers("8"), Ok([0, 0, 0, 0, 0, 0, 0, 0, 1]));
    assert_eq!(parse_timers("0,0,0"), Ok([3, 0, 0, 0, 0, 0, 0, 0, 0]));
}

#[test]
fn test_parse_timers_is_pure() {
    assert_eq!(parse_timers("1,1,5,0"), parse_timers("1,1,5,0"));
}

#[test]
fn test_parse_timers_rejects_malformed_input() {
    assert!(parse_timers("").is_err());
    assert!(parse_timers("fish").is_err());
    assert!(parse_timers("3,,4").is_err());
    assert!(parse_timers("3,4 5").is_err());
    assert!(parse_timers("3,4,").is_err());
    assert!(parse_timers("-1,2").is_err());
}

#[test]
fn test_parse_timers_rejects_out_of_range_timer() {
    assert_eq!(
        parse_timers("9"),
        Err(SimulationError::InvalidInput(
            "timer 9 is outside the range 0-8".to_string()
        ))
    );
    assert!(parse_timers("3,4,100").is_err());
}

#[test]
fn test_parse_timers_rejects_oversized_input() {
    let big = "1,".repeat(MAX_INPUT_LEN);
    assert_eq!(parse_timers(&big), Err(SimulationError::InputTooLarge));
}

// One day passes: every timer counts down by one.  An individual at 0
// reproduces instead, resetting to RESET_TIMER, and its offspring
// starts at SPAWN_TIMER.  All nine new values are computed into a fresh
// array so the old state stays intact until we are done with it.
fn next_day(current: &Histogram) -> Result<Histogram, SimulationError> {
    let spawning = current[0];
    let mut next: Histogram = [0; TIMER_STATES];
    for timer in 1..TIMER_STATES {
        next[timer - 1] = current[timer];
    }
    next[SPAWN_TIMER] = spawning;
    next[RESET_TIMER] = match next[RESET_TIMER].checked_add(spawning) {
        Some(count) => count,
        None => {
            return Err(SimulationError::Overflow);
        }
    };
    Ok(next)
}

#[test]
fn test_next_day_decrements_every_timer() {
    for timer in 1..TIMER_STATES {
        let mut current: Histogram = [0; TIMER_STATES];
        current[timer] = 1;
        let mut expected: Histogram = [0; TIMER_STATES];
        expected[timer - 1] = 1;
        assert_eq!(next_day(&current), Ok(expected));
    }
}

#[test]
fn test_next_day_reproduces_expired_timers() {
    let mut current: Histogram = [0; TIMER_STATES];
    current[0] = 5;
    let mut expected: Histogram = [0; TIMER_STATES];
    expected[RESET_TIMER] = 5;
    expected[SPAWN_TIMER] = 5;
    assert_eq!(next_day(&current), Ok(expected));
}

#[test]
fn test_next_day_detects_bucket_overflow() {
    let mut current: Histogram = [0; TIMER_STATES];
    current[0] = u64::MAX;
    current[RESET_TIMER + 1] = 1;
    assert_eq!(next_day(&current), Err(SimulationError::Overflow));
}

fn total(histogram: &Histogram) -> Result<u64, SimulationError> {
    let mut sum: u64 = 0;
    for count in histogram.iter() {
        sum = match sum.checked_add(*count) {
            Some(s) => s,
            None => {
                return Err(SimulationError::Overflow);
            }
        };
    }
    Ok(sum)
}

#[test]
fn test_total() {
    assert_eq!(total(&[0; TIMER_STATES]), Ok(0));
    assert_eq!(total(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), Ok(45));
    assert_eq!(
        total(&[u64::MAX, 1, 0, 0, 0, 0, 0, 0, 0]),
        Err(SimulationError::Overflow)
    );
}

fn simulate(mut population: Histogram, days: usize) -> Result<Histogram, SimulationError> {
    for day in 1..=days {
        population = next_day(&population)?;
        let running_total = total(&population)?;
        event!(
            Level::DEBUG,
            "after day {:>3}: {:?} (total {})",
            day,
            population,
            running_total
        );
    }
    Ok(population)
}

#[test]
fn test_simulate_zero_days_changes_nothing() {
    let start = parse_timers("3,4,3,1,2").unwrap();
    assert_eq!(simulate(start, 0), Ok(start));
    assert_eq!(total(&start), Ok(5));
}

#[test]
fn test_population_never_decreases() {
    let mut population = parse_timers("3,4,3,1,2").unwrap();
    let mut previous = total(&population).unwrap();
    for _day in 0..64 {
        population = next_day(&population).unwrap();
        let current = total(&population).unwrap();
        assert!(current >= previous);
        previous = current;
    }
}

#[test]
fn test_simulate_known_totals() {
    let start = parse_timers("3,4,3,1,2").unwrap();
    let totals = |days: usize| total(&simulate(start, days).unwrap()).unwrap();
    assert_eq!(totals(18), 26);
    assert_eq!(totals(80), 5934);
    assert_eq!(totals(256), 26984457539);
}

fn run(input: &str) -> Result<u64, SimulationError> {
    let histogram = parse_timers(input)?;
    event!(
        Level::INFO,
        "initial population is {}: {:?}",
        total(&histogram)?,
        histogram
    );
    let finished = simulate(histogram, SIMULATION_DAYS)?;
    total(&finished)
}

#[test]
fn test_run_end_to_end() {
    assert_eq!(run("3,4,3,1,2\n"), Ok(26984457539));
    assert!(run("3,4,9").is_err());
}

fn main() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let mut input = String::new();
    match io::stdin()
        .take((MAX_INPUT_LEN + 1) as u64)
        .read_to_string(&mut input)
    {
        Ok(_) => (),
        Err(e) => {
            panic!("failed to read input: {}", e);
        }
    }
    match run(input.as_str()) {
        Ok(population) => {
            println!("total: {}", population);
        }
        Err(e) => {
            eprintln!("fail: {}", e);
            std::process::exit(1);
        }
    }
}
