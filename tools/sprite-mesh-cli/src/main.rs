//! sprite-mesh - batch front end for sprite mesh documents
//!
//! Reads a JSON mesh document, applies one operation and writes the result.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sprite_mesh_cli::{
    generate_weights, load_settings, mesh_info, read_mesh, smooth, subdivide, triangulate,
    write_mesh, write_packed,
};

#[derive(Parser)]
#[command(name = "sprite-mesh")]
#[command(about = "Sprite mesh triangulation and skinning tool")]
#[command(version)]
struct Cli {
    /// TOML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print mesh statistics as JSON
    Info {
        /// Input mesh document
        input: PathBuf,
    },

    /// Rebuild the triangle list from vertices and edges
    Triangulate {
        /// Input mesh document
        input: PathBuf,

        /// Output document (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Insert vertices until no triangle exceeds a share of the largest one
    Subdivide {
        /// Input mesh document
        input: PathBuf,

        /// Output document (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Largest-triangle area factor (overrides the config)
        #[arg(short, long)]
        factor: Option<f32>,
    },

    /// Compute bone weights and depth-sort the triangles
    Weights {
        /// Input mesh document
        input: PathBuf,

        /// Output document (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the packed vertex buffer here
        #[arg(long)]
        packed: Option<PathBuf>,
    },

    /// Laplacian-smooth the bone weights
    Smooth {
        /// Input mesh document
        input: PathBuf,

        /// Output document (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Smoothing passes
        #[arg(short, long, default_value_t = 1)]
        iterations: u32,
    },
}

fn output_path(input: &Path, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| input.to_path_buf())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { input } => {
            let mesh = read_mesh(&input)?;
            println!("{}", serde_json::to_string_pretty(&mesh_info(&mesh))?);
        }

        Commands::Triangulate { input, output } => {
            let output = output_path(&input, output);
            tracing::info!("Triangulating {:?} -> {:?}", input, output);
            let mut mesh = read_mesh(&input)?;
            triangulate(&mut mesh, &settings);
            write_mesh(&mesh, &output)?;
            tracing::info!("{} triangles", mesh.indices().len() / 3);
        }

        Commands::Subdivide {
            input,
            output,
            factor,
        } => {
            let output = output_path(&input, output);
            tracing::info!("Subdividing {:?} -> {:?}", input, output);
            let mut mesh = read_mesh(&input)?;
            subdivide(&mut mesh, &settings, factor);
            write_mesh(&mesh, &output)?;
            tracing::info!("{} vertices", mesh.vertex_count());
        }

        Commands::Weights {
            input,
            output,
            packed,
        } => {
            let output = output_path(&input, output);
            tracing::info!("Weighting {:?} -> {:?}", input, output);
            let mut mesh = read_mesh(&input)?;
            if mesh.bones().is_empty() {
                tracing::warn!("Mesh has no bones, weights will be cleared");
            }
            generate_weights(&mut mesh, &settings)?;
            write_mesh(&mesh, &output)?;
            if let Some(packed) = packed {
                write_packed(&mesh, &packed)?;
                tracing::info!("Packed vertices written to {:?}", packed);
            }
            tracing::info!("Done!");
        }

        Commands::Smooth {
            input,
            output,
            iterations,
        } => {
            let output = output_path(&input, output);
            tracing::info!("Smoothing {:?} -> {:?} ({} passes)", input, output, iterations);
            let mut mesh = read_mesh(&input)?;
            smooth(&mut mesh, iterations)?;
            write_mesh(&mesh, &output)?;
            tracing::info!("Done!");
        }
    }

    Ok(())
}
