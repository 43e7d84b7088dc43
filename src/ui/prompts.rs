use crate::error::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use std::path::{Path, PathBuf};

/// The three workflow stages plus quit, mirroring the subcommand surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    SetUpWorkspace,
    PrepareShapefiles,
    PackageDeliverable,
    Quit,
}

pub fn main_menu() -> Result<MenuChoice> {
    let items = [
        "Set up working environment",
        "Prepare intermediate shapefiles",
        "Create deliverable package",
        "Quit",
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What would you like to do?")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(match selection {
        0 => MenuChoice::SetUpWorkspace,
        1 => MenuChoice::PrepareShapefiles,
        2 => MenuChoice::PackageDeliverable,
        _ => MenuChoice::Quit,
    })
}

pub fn job_number() -> Result<String> {
    required_text("Job number")
}

pub fn state_name() -> Result<String> {
    required_text("State name")
}

pub fn city_name() -> Result<String> {
    required_text("City name")
}

pub fn source_path() -> Result<PathBuf> {
    let raw = required_text("Design tool output path")?;
    Ok(PathBuf::from(raw))
}

pub fn confirm_packaging(output_dir: &Path) -> Result<bool> {
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Create deliverable archive at {}.zip?",
            output_dir.display()
        ))
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn required_text(prompt: &str) -> Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("a value is required")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(value.trim().to_string())
}
