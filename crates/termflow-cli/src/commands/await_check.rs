use crate::support::{
    EXIT_REJECTED, describe_rendered, print_json_or_exit, print_violation, render_term,
};
use serde_json::json;
use std::thread;
use std::time::Duration;
use termflow_pipeline::TermflowConfig;
use termflow_term::{Asynchronous, Synchronicity, Term, spawn_pending};

pub const AWAIT_CHECK_SCHEMA: u64 = 1;
pub const AWAIT_CHECK_KIND: &str = "termflow.await_check.v1";

pub struct Args {
    pub delay_ms: u64,
    pub timeout_ms: u64,
    pub value: i64,
    pub json: bool,
}

/// Spawn a producer that resolves after `delay_ms`, wait for it with a
/// `timeout_ms` bound, then pipe the result through a continuation and
/// await that without a caller bound.
pub fn run(args: Args, config: &TermflowConfig) {
    let delay = Duration::from_millis(args.delay_ms);
    let timeout = Duration::from_millis(args.timeout_ms);
    let value = args.value;

    let term = spawn_pending(config.default_max_block(), move || {
        thread::sleep(delay);
        Term::single(value)
    });
    let synchronous_at_start = Synchronicity::of(term.clone()).is_synchronous();
    let asynchronous = Asynchronous::new(term).with_ceiling(config.await_ceiling());

    let bounded = asynchronous.await_for(timeout);
    let bounded = render_term(&bounded);
    if let Err(violation) = &bounded {
        tracing::warn!(
            contract = %violation.contract,
            timeout_ms = args.timeout_ms,
            "bounded await failed"
        );
    }

    let doubled = Asynchronous::new(asynchronous.pipe(|resolved| match resolved {
        Term::Single(n) => Term::single(n.saturating_mul(2)),
        other => other,
    }))
    .with_ceiling(config.await_ceiling());
    let piped = render_term(&doubled.await_max());

    if args.json {
        let outcome = |rendered: &Result<serde_json::Value, termflow_contract::Violation>| {
            match rendered {
                Ok(output) => json!({"result": "resolved", "output": output}),
                Err(violation) => json!({"result": "rejected", "violation": violation}),
            }
        };
        let payload = json!({
            "schema": AWAIT_CHECK_SCHEMA,
            "kind": AWAIT_CHECK_KIND,
            "delayMs": args.delay_ms,
            "timeoutMs": args.timeout_ms,
            "maxBlockNanoseconds": asynchronous.max_block_nanoseconds(),
            "synchronousAtStart": synchronous_at_start,
            "bounded": outcome(&bounded),
            "piped": outcome(&piped),
        });
        print_json_or_exit(&payload, "await-check");
    } else {
        println!("termflow await-check");
        println!("  Producer delay: {}ms", args.delay_ms);
        println!("  Timeout: {}ms", args.timeout_ms);
        println!("  Max block: {:?}", asynchronous.max_block());
        match &bounded {
            Ok(output) => println!("  Bounded await ({})", describe_rendered(output)),
            Err(violation) => print_violation(violation),
        }
        match &piped {
            Ok(output) => println!("  Piped ({})", describe_rendered(output)),
            Err(violation) => print_violation(violation),
        }
    }

    if bounded.is_err() {
        std::process::exit(EXIT_REJECTED);
    }
}
