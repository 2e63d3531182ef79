//! Terminal confirmation for proposed tag changes.

use std::io::{self, BufRead, Write};
use vaulttag_core::model::tag::display_tags;
use vaulttag_core::{Confirm, Decision, PlannedChange};

/// Asks on stdin for every change. End of input quits the run.
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, change: &PlannedChange) -> Decision {
        print_change(change);
        print!("apply? [y]es / [s]kip / [q]uit: ");
        if io::stdout().flush().is_err() {
            return Decision::Quit;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => Decision::Quit,
            Ok(_) => parse_answer(&answer),
        }
    }
}

pub fn print_change(change: &PlannedChange) {
    let reconciliation = &change.reconciliation;
    println!("\n{}", change.path.display());
    if reconciliation.is_noop() {
        println!("  no changes needed");
        return;
    }
    if !reconciliation.added.is_empty() {
        println!("  + {}", display_tags(&reconciliation.added));
    }
    if !reconciliation.removed.is_empty() {
        println!("  - {}", display_tags(&reconciliation.removed));
    }
    let retained = change.inline_retained();
    if !retained.is_empty() {
        println!("  (still inline in body: {})", display_tags(&retained));
    }
    println!("  = {}", display_tags(&reconciliation.final_tags));
}

fn parse_answer(answer: &str) -> Decision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Decision::Apply,
        "s" | "skip" => Decision::Skip,
        "q" | "quit" => Decision::Quit,
        _ => Decision::Ignore,
    }
}
