// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! The interactive menu opened when no flag is given (spec §6: "absence
//! opens the interactive menu"). A thin read-eval-print loop over the same
//! command handlers the flag dispatch uses.

use std::io::Write;

use crate::commands;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use anon_engine::Orchestrator;

pub async fn run(orchestrator: &mut Orchestrator, format: OutputFormat) -> Result<(), ExitError> {
    loop {
        print_menu();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            return Ok(()); // EOF: quit quietly
        }
        match line.trim() {
            "1" => report(commands::lifecycle::extreme(orchestrator).await),
            "2" => report(commands::lifecycle::partial(orchestrator).await),
            "3" => report(commands::lifecycle::disable(orchestrator).await),
            "4" => report(commands::status::run(&orchestrator.ctx, format).await),
            "5" => report(commands::verify::run(&orchestrator.ctx, format).await),
            "6" => report(commands::newid::run(&orchestrator.ctx).await),
            "7" => report(commands::lifecycle::restore(orchestrator).await),
            "8" => report(commands::logs::run(&orchestrator.ctx.paths, format)),
            "q" | "quit" | "exit" => return Ok(()),
            other => println!("unrecognized choice: {other:?}"),
        }
    }
}

fn print_menu() {
    print!(
        "\nanonctl\n\
         1) enable extreme\n\
         2) enable partial\n\
         3) disable\n\
         4) status\n\
         5) verify\n\
         6) new identity\n\
         7) emergency restore\n\
         8) logs\n\
         q) quit\n\
         > "
    );
    let _ = std::io::stdout().flush();
}

fn report(result: Result<(), ExitError>) {
    if let Err(e) = result {
        eprintln!("error: {e}");
    }
}
