use clap::Parser;
use fiberprep::ui::prompts;
use fiberprep::{
    Cli, Command, FiberPrep, FiberPrepError, MenuChoice, OutputFormatter, OutputMode,
    UserFriendlyError,
};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    // Config generation runs before config loading and root validation.
    if let Some(Command::GenerateConfig { ref path }) = cli.command {
        return handle_generate_config(path.as_deref());
    }

    let app = match FiberPrep::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    if cli.command.is_none() {
        app.output_formatter().print_header("Fiber design job workflow");
    }

    let action = match resolve_action(&cli) {
        Ok(Some(action)) => action,
        Ok(None) => return 0, // Quit from the menu
        Err(e) => {
            app.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    match dispatch(&app, &action) {
        Ok(()) => 0,
        Err(e) => {
            app.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

/// One resolved workflow invocation, from either a subcommand or the menu.
enum Action {
    Setup {
        job: String,
        state: String,
        city: String,
    },
    Prepare {
        job: String,
    },
    Package {
        job: String,
        state: String,
        city: String,
        source: PathBuf,
        assume_yes: bool,
    },
}

fn resolve_action(cli: &Cli) -> fiberprep::Result<Option<Action>> {
    match &cli.command {
        Some(Command::Setup { job, state, city }) => Ok(Some(Action::Setup {
            job: job.clone(),
            state: state.clone(),
            city: city.clone(),
        })),
        Some(Command::Prepare { job }) => Ok(Some(Action::Prepare { job: job.clone() })),
        Some(Command::Package {
            job,
            state,
            city,
            source,
            yes,
        }) => Ok(Some(Action::Package {
            job: job.clone(),
            state: state.clone(),
            city: city.clone(),
            source: source.clone(),
            assume_yes: *yes,
        })),
        // Handled before the app is constructed.
        Some(Command::GenerateConfig { .. }) => Ok(None),
        None => prompt_action(),
    }
}

fn prompt_action() -> fiberprep::Result<Option<Action>> {
    match prompts::main_menu()? {
        MenuChoice::Quit => Ok(None),
        MenuChoice::SetUpWorkspace => Ok(Some(Action::Setup {
            job: prompts::job_number()?,
            state: prompts::state_name()?,
            city: prompts::city_name()?,
        })),
        MenuChoice::PrepareShapefiles => Ok(Some(Action::Prepare {
            job: prompts::job_number()?,
        })),
        MenuChoice::PackageDeliverable => Ok(Some(Action::Package {
            job: prompts::job_number()?,
            state: prompts::state_name()?,
            city: prompts::city_name()?,
            source: prompts::source_path()?,
            assume_yes: false,
        })),
    }
}

fn dispatch(app: &FiberPrep, action: &Action) -> fiberprep::Result<()> {
    match action {
        Action::Setup { job, state, city } => {
            app.set_up_workspace(job, state, city)?;
        }
        Action::Prepare { job } => {
            app.prepare_shapefiles(job)?;
        }
        Action::Package {
            job,
            state,
            city,
            source,
            assume_yes,
        } => {
            if *assume_yes {
                app.package_deliverable(job, state, city, source, &|_: &Path| Ok(true))?;
            } else {
                app.package_deliverable(job, state, city, source, &prompts::confirm_packaging)?;
            }
        }
    }

    Ok(())
}

fn handle_generate_config(path: Option<&Path>) -> i32 {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("fiberprep.toml"));

    if config_path.exists() {
        let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
        formatter.warning(&format!(
            "Overwriting existing configuration file: {}",
            config_path.display()
        ));
    }

    match FiberPrep::generate_sample_config(&config_path) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                config_path.display()
            );
            println!("\nTo use this configuration:");
            println!("  fiberprep --config {} <subcommand>", config_path.display());
            println!("\nEdit the file to point the roots at your directories.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &FiberPrepError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn exit_code_for(error: &FiberPrepError) -> i32 {
    match error {
        FiberPrepError::Cancelled => 130, // Interrupted (SIGINT)
        FiberPrepError::RootMissing { .. } => 3,
        FiberPrepError::NoArchivesFound { .. } => 4,
        FiberPrepError::DiscoveryFailed { .. } => 5,
        FiberPrepError::CountMismatch { .. } => 6,
        FiberPrepError::DestinationExists { .. } => 8,
        _ => 1, // General error
    }
}
