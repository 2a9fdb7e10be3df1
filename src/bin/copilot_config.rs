//! `copilot-config` — the Config Compiler CLI: `compile`, `explain-key`,
//! `explain-preset`, `explain-profile`, and `list-presets`, each emitting
//! either the type's `Display` text or its `Serialize` JSON. Grounded in
//! the teacher's `bin/fleet_hub.rs` clap shape, retargeted from a daemon
//! to a one-shot diagnostic tool.

use std::collections::HashMap;

use clap::{Parser, Subcommand};

use copilot::config_compiler::{
    modifiers::build_default_modifiers, presets::build_default_presets, registry::build_default_registry,
    ConfigCompiler, ParamValue, ParameterOverrides,
};

#[derive(Parser, Debug)]
#[command(name = "copilot-config", about = "Explain and compile DSQL/SDK tuning profiles")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,

    /// Emit JSON instead of the human-readable text rendering.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every available scale preset.
    ListPresets,
    /// Explain a single registry parameter.
    ExplainKey {
        key: String,
    },
    /// Explain the full resolved parameter set for a preset.
    ExplainPreset {
        preset: String,
    },
    /// Explain the derivation trace and guard rail verdicts for a compiled profile.
    ExplainProfile {
        preset: String,
        #[arg(long)]
        modifier: Option<String>,
        /// Repeatable `key=value` override, e.g. `--override history.shards=1024`.
        #[arg(long = "override")]
        overrides: Vec<String>,
    },
    /// Compile a preset (+ optional modifier, + optional overrides) into a full result.
    Compile {
        preset: String,
        #[arg(long)]
        modifier: Option<String>,
        #[arg(long = "override")]
        overrides: Vec<String>,
    },
}

fn parse_overrides(raw: &[String]) -> anyhow::Result<ParameterOverrides> {
    let mut values = HashMap::new();
    for item in raw {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("override '{item}' must be in key=value form"))?;
        let parsed = if let Ok(b) = value.parse::<bool>() {
            ParamValue::Bool(b)
        } else if let Ok(i) = value.parse::<i64>() {
            ParamValue::Int(i)
        } else if let Ok(f) = value.parse::<f64>() {
            ParamValue::Float(f)
        } else {
            ParamValue::Str(value.to_string())
        };
        values.insert(key.to_string(), parsed);
    }
    Ok(ParameterOverrides { values })
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let compiler = ConfigCompiler::new(build_default_registry(), build_default_presets(), build_default_modifiers());

    match args.command {
        Command::ListPresets => {
            let presets = compiler.list_presets();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else {
                for p in presets {
                    println!("{}: {} ({:?})", p.name, p.description, p.throughput_range);
                }
            }
        }
        Command::ExplainKey { key } => {
            let explanation = compiler.explain_key(&key)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&explanation)?);
            } else {
                println!("{explanation}");
            }
        }
        Command::ExplainPreset { preset } => {
            let explanation = compiler.explain_preset(&preset)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&explanation)?);
            } else {
                println!("{explanation}");
            }
        }
        Command::ExplainProfile { preset, modifier, overrides } => {
            let overrides = parse_overrides(&overrides)?;
            let explanation = compiler.explain_profile(&preset, modifier.as_deref(), &overrides)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&explanation)?);
            } else {
                println!("{explanation}");
            }
        }
        Command::Compile { preset, modifier, overrides } => {
            let overrides = parse_overrides(&overrides)?;
            let result = compiler.compile(&preset, modifier.as_deref(), &overrides)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.why_section);
                println!("--- dynamic config ---\n{}", result.dynamic_config_yaml);
            }
        }
    }

    Ok(())
}
