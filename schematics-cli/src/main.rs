mod manifest;
mod state;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use schematics_core::differ::{self, Diff};
use schematics_core::provider::ResourceType;
use schematics_core::resource::{Resource, State, Value};
use schematics_core::schema::{AttributeMode, ResourceSchema};
use schematics_provider::{ProviderConfig, SchematicsProvider, data_sources, resources};

use manifest::Manifest;
use state::{DEFAULT_STATE_FILE, ResourceState, StateFile};

#[derive(Parser)]
#[command(name = "schematics")]
#[command(about = "Manage IBM Cloud Schematics agents, workspaces, actions, jobs and policies", long_about = None)]
struct Cli {
    /// Region used when a resource names no location (overrides IC_REGION)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Schematics API endpoint (overrides IBMCLOUD_SCHEMATICS_API_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// IAM access token (overrides IC_IAM_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// IAM refresh token (overrides IC_IAM_REFRESH_TOKEN)
    #[arg(long, global = true)]
    refresh_token: Option<String>,

    /// Path to the state file
    #[arg(long, global = true, default_value = DEFAULT_STATE_FILE)]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a resource file against its schema
    Validate {
        /// Path to the resource JSON file
        file: PathBuf,
    },
    /// Show the schema of a resource type, or list all types
    Schema {
        /// Resource or data source type
        resource_type: Option<String>,
    },
    /// Refresh the stored state of a resource from the service
    Read {
        file: PathBuf,
    },
    /// Create or update a resource to match its file
    Apply {
        file: PathBuf,
    },
    /// Delete a resource recorded in the state file
    Destroy {
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Look up an existing object through a data source
    Data {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Validate { file } => run_validate(file),
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Read { file } => run_read(&cli, file).await,
        Commands::Apply { file } => run_apply(&cli, file).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&cli, file, *auto_approve).await,
        Commands::Data { file } => run_data(&cli, file).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

// =============================================================================
// Provider setup
// =============================================================================

fn provider_config(cli: &Cli) -> Result<ProviderConfig, String> {
    let mut config = ProviderConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(ref region) = cli.region {
        config = config.with_region(region);
    }
    if let Some(ref endpoint) = cli.endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(ref token) = cli.token {
        let refresh = cli
            .refresh_token
            .clone()
            .or_else(|| config.iam_refresh_token.clone());
        config = config.with_tokens(token, refresh);
    } else if let Some(ref refresh) = cli.refresh_token {
        config.iam_refresh_token = Some(refresh.clone());
    }
    Ok(config)
}

/// Build the provider; Ctrl-C cancels any job wait in progress
fn get_provider(cli: &Cli) -> Result<SchematicsProvider, String> {
    let provider = SchematicsProvider::new(provider_config(cli)?).map_err(|e| e.to_string())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, cancelling job waits");
            on_interrupt.cancel();
        }
    });

    Ok(provider.with_cancellation(cancel))
}

fn find_schema(types: Vec<Box<dyn ResourceType>>, resource_type: &str) -> Option<ResourceSchema> {
    types
        .into_iter()
        .find(|t| t.name() == resource_type)
        .map(|t| t.schema())
}

fn resource_schema(resource_type: &str) -> Result<ResourceSchema, String> {
    find_schema(resources::resource_types(), resource_type)
        .ok_or_else(|| format!("Unknown resource type: {}", resource_type))
}

fn data_source_schema(resource_type: &str) -> Result<ResourceSchema, String> {
    find_schema(data_sources::data_source_types(), resource_type)
        .ok_or_else(|| format!("Unknown data source: {}", resource_type))
}

fn validate_resource(schema: &ResourceSchema, resource: &Resource) -> Result<(), String> {
    schema.validate(&resource.attributes).map_err(|errors| {
        errors
            .iter()
            .map(|e| format!("{}: {}", resource.id, e))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn load_resource(file: &Path) -> Result<(ResourceSchema, Resource), String> {
    let resource = Manifest::load(file)?.into_resource(false)?;
    let schema = resource_schema(&resource.id.resource_type)?;
    validate_resource(&schema, &resource)?;
    Ok((schema, resource))
}

// =============================================================================
// Commands
// =============================================================================

fn run_validate(file: &Path) -> Result<(), String> {
    let (_, resource) = load_resource(file)?;
    println!("{} {} is valid", "✓".green(), resource.id);
    Ok(())
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let Some(resource_type) = resource_type else {
        println!("{}", "Resources:".bold());
        for t in resources::resource_types() {
            println!("  {}", t.name());
        }
        println!("{}", "Data sources:".bold());
        for t in data_sources::data_source_types() {
            println!("  {}", t.name());
        }
        return Ok(());
    };

    let schema = resource_schema(resource_type).or_else(|_| data_source_schema(resource_type))?;
    println!("{}", schema.resource_type.bold());
    if let Some(ref description) = schema.description {
        println!("  {}", description.dimmed());
    }
    for attr in schema.sorted_attributes() {
        let mode = match attr.mode {
            AttributeMode::Required => "required".yellow(),
            AttributeMode::Optional => "optional".normal(),
            AttributeMode::OptionalComputed => "optional, computed".normal(),
            AttributeMode::Computed => "computed".dimmed(),
        };
        let mut flags = Vec::new();
        if attr.force_new {
            flags.push("force new");
        }
        if attr.local_only {
            flags.push("local");
        }
        if attr.sensitive {
            flags.push("sensitive");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("  {}: {} ({}){}", attr.name.cyan(), attr.attr_type, mode, flags);
    }
    Ok(())
}

async fn run_read(cli: &Cli, file: &Path) -> Result<(), String> {
    let (schema, resource) = load_resource(file)?;
    let mut state_file = StateFile::load(&cli.state)?;
    let Some(stored) = state_file.find(&resource.id).cloned() else {
        println!("{} is not in the state file.", resource.id);
        return Ok(());
    };

    let provider = get_provider(cli)?;
    let mut current = provider
        .read_resource(&resource.id, Some(&stored.identifier))
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;

    if !current.exists {
        state_file.remove(&resource.id);
        state_file.save(&cli.state)?;
        println!(
            "{} {} no longer exists; removed from state.",
            "!".yellow().bold(),
            resource.id
        );
        return Ok(());
    }

    differ::carry_over_local(&schema, &stored.attributes(), &mut current.attributes);
    record(&mut state_file, &current);
    state_file.save(&cli.state)?;
    print_state(&schema, &current);
    Ok(())
}

async fn run_apply(cli: &Cli, file: &Path) -> Result<(), String> {
    let (schema, resource) = load_resource(file)?;
    let mut state_file = StateFile::load(&cli.state)?;
    let provider = get_provider(cli)?;

    // Refresh first so that a resource deleted out of band is created again
    let current = match state_file.find(&resource.id) {
        Some(stored) => {
            let mut refreshed = provider
                .read_resource(&resource.id, Some(&stored.identifier))
                .await
                .map_err(|e| format!("Failed to read state: {}", e))?;
            differ::carry_over_local(&schema, &stored.attributes(), &mut refreshed.attributes);
            refreshed
        }
        None => State::not_found(resource.id.clone()),
    };

    let state = match differ::diff(&schema, &resource, &current) {
        Diff::NoChange(id) => {
            println!("{} {}", "No changes needed for".green(), id);
            return Ok(());
        }
        Diff::Create(resource) => {
            println!("{} {}", "+".green().bold(), resource.id);
            provider
                .create_resource(&resource)
                .await
                .map_err(|e| format!("Failed to create: {}", e))?
        }
        Diff::Update {
            id,
            from,
            to,
            changed_attributes,
        } => {
            println!(
                "{} {} ({})",
                "~".yellow().bold(),
                id,
                changed_attributes.join(", ")
            );
            let identifier = from.identifier.clone().unwrap_or_default();
            provider
                .update_resource(&id, &identifier, &from, &to)
                .await
                .map_err(|e| format!("Failed to update: {}", e))?
        }
    };

    if !state.exists {
        state_file.remove(&resource.id);
        state_file.save(&cli.state)?;
        return Err(format!("{} disappeared while it was being updated", resource.id));
    }
    record(&mut state_file, &state);
    state_file.save(&cli.state)?;

    println!("{} {}", "✓".green(), "Apply complete!".green().bold());
    print_state(&schema, &state);
    Ok(())
}

async fn run_destroy(cli: &Cli, file: &Path, auto_approve: bool) -> Result<(), String> {
    let resource = Manifest::load(file)?.into_resource(false)?;
    resource_schema(&resource.id.resource_type)?;

    let mut state_file = StateFile::load(&cli.state)?;
    let Some(stored) = state_file.find(&resource.id).cloned() else {
        println!("{} is not in the state file; nothing to destroy.", resource.id);
        return Ok(());
    };

    println!(
        "{} {} ({})",
        "-".red().bold(),
        resource.id,
        stored.identifier
    );
    if !auto_approve && !confirm("Do you really want to destroy this resource?")? {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    let provider = get_provider(cli)?;
    provider
        .delete_resource(&resource.id, &stored.identifier)
        .await
        .map_err(|e| format!("Failed to delete: {}", e))?;

    state_file.remove(&resource.id);
    state_file.save(&cli.state)?;
    println!("{} {}", "✓".green(), "Destroy complete!".green().bold());
    Ok(())
}

async fn run_data(cli: &Cli, file: &Path) -> Result<(), String> {
    let lookup = Manifest::load(file)?.into_resource(true)?;
    let schema = data_source_schema(&lookup.id.resource_type)?;
    validate_resource(&schema, &lookup)?;

    let provider = get_provider(cli)?;
    let state = provider
        .read_data_source(&lookup)
        .await
        .map_err(|e| format!("Failed to read data source: {}", e))?;
    print_state(&schema, &state);
    Ok(())
}

// =============================================================================
// Output helpers
// =============================================================================

fn record(state_file: &mut StateFile, state: &State) {
    if let Some(entry) = ResourceState::from_state(state) {
        state_file.upsert(entry);
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    print!("{} Only 'yes' will be accepted: ", question.bold());
    io::stdout().flush().map_err(|e| e.to_string())?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| format!("Failed to read input: {}", e))?;
    Ok(answer.trim() == "yes")
}

/// Attributes as pretty JSON, with sensitive values masked
fn display_attributes(schema: &ResourceSchema, state: &State) -> serde_json::Value {
    let mut attributes = state.attributes.clone();
    for (name, value) in attributes.iter_mut() {
        if schema.attributes.get(name).is_some_and(|a| a.sensitive) {
            *value = Value::from("(sensitive)");
        }
    }
    schematics_core::resource::attributes_to_json(&attributes)
}

fn print_state(schema: &ResourceSchema, state: &State) {
    if let Some(ref identifier) = state.identifier {
        println!("{} {}", state.id.to_string().bold(), identifier.dimmed());
    }
    match serde_json::to_string_pretty(&display_attributes(schema, state)) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("failed to render attributes: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::ResourceId;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("schematics").chain(args.iter().copied()))
    }

    #[test]
    fn flags_override_configuration() {
        let cli = cli(&[
            "--region",
            "eu-de",
            "--endpoint",
            "http://localhost:9000",
            "--token",
            "abc",
            "validate",
            "agent.json",
        ]);
        let config = provider_config(&cli).unwrap();
        assert_eq!(config.region, "eu-de");
        assert_eq!(config.endpoint_for(None), "http://localhost:9000");
        assert_eq!(config.iam_access_token.as_deref(), Some("abc"));
    }

    #[test]
    fn schemas_are_found_by_type() {
        assert!(resource_schema("ibm_schematics_agent_prs").is_ok());
        assert!(resource_schema("ibm_schematics_workspace").is_ok());
        assert!(data_source_schema("ibm_schematics_policies").is_ok());
        assert!(data_source_schema("ibm_schematics_action").is_ok());
        assert!(resource_schema("ibm_schematics_policies").is_err());
    }

    #[test]
    fn validation_errors_name_the_resource() {
        let schema = resource_schema("ibm_schematics_inventory").unwrap();
        let resource = Resource::new("ibm_schematics_inventory", "hosts")
            .with_attribute("location", Value::from("mars"));
        let err = validate_resource(&schema, &resource).unwrap_err();
        assert!(err.contains("ibm_schematics_inventory.hosts"));
    }

    #[test]
    fn sensitive_values_are_masked() {
        let schema = ResourceSchema::new("t").attribute(
            schematics_core::schema::AttributeSchema::new(
                "secret",
                schematics_core::schema::AttributeType::String,
            )
            .sensitive(),
        );
        let state = State::existing(
            ResourceId::new("t", "n"),
            [("secret".to_string(), Value::from("hunter2"))]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            display_attributes(&schema, &state),
            serde_json::json!({"secret": "(sensitive)"})
        );
    }
}
