//! Fixture binary for exercising a persistent address space end to end.
//!
//! Exposes no subcommands: each run loads (or creates) `pas-demo.pas` in the
//! current directory, bumps a named counter, appends a run to a log array,
//! and saves back to disk. Running it twice in a row should show the
//! counter advance and the log grow — the whole point is a process that can
//! be killed and restarted without losing state.

use pas_core::{pvector, Pas};

const IMAGE_PATH: &str = "pas-demo.pas";
const COUNTER_NAME: &str = "run_count";
const LOG_NAME: &str = "run_log";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut pas = Pas::load(IMAGE_PATH)?;

    let counter_off = pas.find_typed::<u64>(COUNTER_NAME);
    let counter_off = if counter_off.is_null() {
        pas.create::<u64>(Some(COUNTER_NAME))
    } else {
        counter_off
    };
    let count = {
        let count = pas.resolve_mut::<u64>(counter_off).expect("just created");
        *count += 1;
        *count
    };

    let log_hdr = pas.find(LOG_NAME);
    let log = if log_hdr.is_null() {
        pvector::PVector::<u64>::new(&mut pas, Some(LOG_NAME))
    } else {
        pvector::PVector::<u64>::from_offset(log_hdr)
    };
    log.push_back(&mut pas, count);

    pas.save(IMAGE_PATH)?;

    tracing::info!(
        run = count,
        history_len = log.len(&pas),
        slots = pas.slot_count(),
        "saved image"
    );
    println!(
        "run #{count}, {} runs recorded, {} live slots",
        log.len(&pas),
        pas.slot_count()
    );
    Ok(())
}
