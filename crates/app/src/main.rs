use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Select};
use music_config_core::store::DEFAULT_DATA_DIR;
use music_config_core::{ConfigStore, EditReport, EditSession, FieldEdit, MusicConfigError};
use tracing_subscriber::EnvFilter;

fn main() -> music_config_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut store = ConfigStore::open(&cli.data_dir);

    match cli.command {
        Commands::Summary => {
            println!("{}", store.summarize());
            Ok(())
        }
        Commands::Show { weather } => run_show(&store, &weather),
        Commands::Edit { weather, set } => {
            let report = EditSession::new(&mut store).edit_weather(&weather, &set)?;
            print_report(&weather, &report);
            Ok(())
        }
        Commands::Add { name, template } => {
            EditSession::new(&mut store).add_weather_from_template(&name, &template)?;
            println!("Added custom weather class: {name}");
            Ok(())
        }
        Commands::Settings { set } => {
            let report = EditSession::new(&mut store).edit_general_settings(&set)?;
            print_report("general settings", &report);
            Ok(())
        }
        Commands::Export { filename } => {
            let path = store.export_document(filename.as_deref().unwrap_or_default())?;
            println!("Configuration exported to {}", path.display());
            Ok(())
        }
        Commands::Interactive => run_interactive(&mut store),
    }
}

fn run_show(store: &ConfigStore, weather: &str) -> music_config_core::Result<()> {
    if !store.contains_weather(weather) {
        tracing::warn!(weather, "unknown weather class, showing fallback");
    }
    let profile = store.weather_profile(weather);
    println!("{profile:#?}");
    println!(
        "chord intervals: {:?}",
        store.chord_intervals(&profile.chord_type)
    );
    Ok(())
}

fn print_report(target: &str, report: &EditReport) {
    for err in &report.rejected {
        println!("{err}, keeping current value.");
    }
    if report.changed() {
        println!("Updated {target}: {}", report.applied.join(", "));
    } else {
        println!("No changes made.");
    }
}

fn run_interactive(store: &mut ConfigStore) -> music_config_core::Result<()> {
    tracing::info!(path = %store.path().display(), "starting interactive editor");
    let mut session = EditSession::new(store);

    let options = [
        "View current configuration",
        "Edit weather class",
        "Add new weather class",
        "Edit general settings",
        "Export configuration",
        "Exit",
    ];

    loop {
        let choice = Select::new()
            .with_prompt("Options")
            .items(&options[..])
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        let outcome = match choice {
            0 => {
                println!("{}", session.store().summarize());
                Ok(())
            }
            1 => interactive_edit_weather(&mut session),
            2 => interactive_add_weather(&mut session),
            3 => interactive_edit_settings(&mut session),
            4 => interactive_export(&session),
            _ => break,
        };

        // Store failures are reported and the menu keeps running.
        if let Err(err) = outcome {
            println!("Error: {err}");
        }
    }
    Ok(())
}

fn select_weather(session: &EditSession<'_>, prompt: &str) -> music_config_core::Result<String> {
    let names = session.store().weather_names();
    let index = Select::new()
        .with_prompt(prompt)
        .items(&names[..])
        .default(0)
        .interact()
        .map_err(prompt_error)?;
    Ok(names[index].to_string())
}

fn ask(prompt: String) -> music_config_core::Result<String> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_error)?;
    Ok(answer.trim().to_string())
}

fn interactive_edit_weather(session: &mut EditSession<'_>) -> music_config_core::Result<()> {
    let weather = select_weather(session, "Select weather class to edit")?;
    edit_weather_parameters(session, &weather)
}

fn edit_weather_parameters(
    session: &mut EditSession<'_>,
    weather: &str,
) -> music_config_core::Result<()> {
    let current = session.store().weather_profile(weather).clone();
    println!("Editing {weather} (press Enter to keep the current value)");

    let mut edits = Vec::new();
    let scalars = [
        ("base_note", current.base_note.to_string()),
        ("tempo", current.tempo.to_string()),
        ("velocity", current.velocity.to_string()),
        ("instrument", current.instrument.to_string()),
    ];
    for (field, value) in scalars {
        let answer = ask(format!("{field} (current: {value})"))?;
        if !answer.is_empty() {
            edits.push(FieldEdit::new(field, answer));
        }
    }

    println!(
        "Available chord types: {}",
        session.store().chord_type_names().join(", ")
    );
    let chord = ask(format!("chord_type (current: {})", current.chord_type))?;
    if !chord.is_empty() {
        edits.push(FieldEdit::new("chord_type", chord));
    }

    println!(
        "Available scales: {}",
        session.store().scale_names().join(", ")
    );
    let scale = ask(format!("scale (current: {})", current.scale_name))?;
    if !scale.is_empty() {
        edits.push(FieldEdit::new("scale", scale));
    }

    let report = session.edit_weather(weather, &edits)?;
    print_report(weather, &report);
    Ok(())
}

fn interactive_add_weather(session: &mut EditSession<'_>) -> music_config_core::Result<()> {
    let name = ask("Enter new weather class name".to_string())?;
    if name.is_empty() {
        println!("Name cannot be empty.");
        return Ok(());
    }
    if session.store().contains_weather(&name) {
        println!("Weather class '{name}' already exists.");
        return Ok(());
    }
    let template = select_weather(session, "Select template to copy from")?;
    session.add_weather_from_template(&name, &template)?;
    println!("Added custom weather class: {name}");

    let edit_now = Confirm::new()
        .with_prompt("Edit parameters now?")
        .default(false)
        .interact()
        .map_err(prompt_error)?;
    if edit_now {
        edit_weather_parameters(session, &name)?;
    }
    Ok(())
}

fn interactive_edit_settings(session: &mut EditSession<'_>) -> music_config_core::Result<()> {
    let current = session.store().general_settings().clone();
    println!("Editing general settings (press Enter to keep the current value)");

    let prompts = [
        ("sequence_length", current.sequence_length.to_string()),
        ("smoothing_window", current.smoothing_window.to_string()),
        ("default_duration", current.default_duration.to_string()),
        (
            "transition_smoothing",
            format!("{} [y/n]", current.transition_smoothing),
        ),
    ];
    let mut edits = Vec::new();
    for (field, value) in prompts {
        let answer = ask(format!("{field} (current: {value})"))?;
        if !answer.is_empty() {
            edits.push(FieldEdit::new(field, answer));
        }
    }

    let report = session.edit_general_settings(&edits)?;
    print_report("general settings", &report);
    Ok(())
}

fn interactive_export(session: &EditSession<'_>) -> music_config_core::Result<()> {
    let filename = ask("Enter filename for export (e.g., my_config.json)".to_string())?;
    let path = session.export(&filename)?;
    println!("Configuration exported to {}", path.display());
    Ok(())
}

fn prompt_error(err: dialoguer::Error) -> MusicConfigError {
    MusicConfigError::msg(format!("failed to read user input: {err}"))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Weather to music configuration editor", long_about = None)]
struct Cli {
    /// Directory holding music_config.json and exports.
    #[arg(long, env = "MUSIC_CONFIG_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the configuration summary.
    Summary,
    /// Print every parameter of one weather class.
    Show { weather: String },
    /// Change fields of an existing weather class.
    Edit {
        weather: String,
        /// Field assignment such as `tempo=100` or `scale=dorian`.
        #[arg(long = "set", required = true)]
        set: Vec<FieldEdit>,
    },
    /// Add a weather class copied from an existing one.
    Add {
        name: String,
        #[arg(short, long, default_value = "Sunny")]
        template: String,
    },
    /// Change general settings.
    Settings {
        #[arg(long = "set", required = true)]
        set: Vec<FieldEdit>,
    },
    /// Write a copy of the configuration next to the primary file.
    Export { filename: Option<String> },
    /// Menu-driven editor.
    Interactive,
}
