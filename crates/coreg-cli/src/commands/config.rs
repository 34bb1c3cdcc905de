use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use coreg_core::config::{
    AlignmentConfig, CorrelationConfig, FeatureConfig, IntensityConfig, RegistrationMethod,
};
use coreg_core::frame::LayerKind;

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Correlation,
    Intensity,
    Feature,
}

impl MethodArg {
    pub fn to_method(self) -> RegistrationMethod {
        match self {
            Self::Correlation => RegistrationMethod::Correlation(CorrelationConfig::default()),
            Self::Intensity => RegistrationMethod::Intensity(IntensityConfig::default()),
            Self::Feature => RegistrationMethod::Feature(FeatureConfig::default()),
        }
    }
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Registration algorithm to emit defaults for
    #[arg(long, value_enum, default_value = "correlation")]
    pub method: MethodArg,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full default AlignmentConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = AlignmentConfig::default()
        .with_algorithm(args.method.to_method())
        .with_layer_kind("labels", LayerKind::Categorical);
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
