//! brepscan CLI - analyze a part and print what was recognized
//!
//! Logs go to stderr (filter with `RUST_LOG`), results to stdout.

use anyhow::{Context, Result};
use brepscan_analysis::{
    AnalysisConfig, AnalyzeResult, Analyzer, ClassifierStrategy, DisplayMesh, MeshQuality,
};
use brepscan_kernel_analytic::AnalyticKernel;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "brepscan")]
#[command(about = "Face classification and feature recognition for B-rep parts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a part and print the full result as JSON
    Analyze {
        #[command(flatten)]
        opts: AnalyzeOpts,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print a human-readable summary of a part
    Info {
        #[command(flatten)]
        opts: AnalyzeOpts,
    },
    /// Write the labeled display mesh as binary STL
    Mesh {
        #[command(flatten)]
        opts: AnalyzeOpts,
        /// Output .stl file
        output: PathBuf,
    },
    /// Print the default configuration as TOML
    DefaultConfig,
}

#[derive(clap::Args)]
struct AnalyzeOpts {
    /// JSON part description
    part: PathBuf,
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Mesh quality preset
    #[arg(short, long, value_enum)]
    quality: Option<Quality>,
    /// Face classifier
    #[arg(short, long, value_enum)]
    strategy: Option<Strategy>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Quality {
    Fast,
    Balanced,
    Ultra,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    RayCast,
    CenterDistance,
    Hybrid,
}

impl From<Quality> for MeshQuality {
    fn from(q: Quality) -> Self {
        match q {
            Quality::Fast => MeshQuality::Fast,
            Quality::Balanced => MeshQuality::Balanced,
            Quality::Ultra => MeshQuality::Ultra,
        }
    }
}

impl From<Strategy> for ClassifierStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::RayCast => ClassifierStrategy::RayCast,
            Strategy::CenterDistance => ClassifierStrategy::CenterDistance,
            Strategy::Hybrid => ClassifierStrategy::Hybrid,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { opts, pretty } => {
            let result = run(&opts)?;
            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{json}");
        }
        Commands::Info { opts } => {
            let result = run(&opts)?;
            show_info(&opts.part, &result);
        }
        Commands::Mesh { opts, output } => {
            let result = run(&opts)?;
            std::fs::write(&output, stl_bytes(&result.mesh))
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(
                path = %output.display(),
                triangles = result.mesh.triangle_count,
                "wrote STL"
            );
        }
        Commands::DefaultConfig => {
            print!("{}", AnalysisConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}

fn load_config(opts: &AnalyzeOpts) -> Result<AnalysisConfig> {
    let mut config = match &opts.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(q) = opts.quality {
        config.mesh.quality = q.into();
    }
    if let Some(s) = opts.strategy {
        config.topology.strategy = s.into();
    }
    Ok(config)
}

fn run(opts: &AnalyzeOpts) -> Result<AnalyzeResult> {
    let config = load_config(opts)?;
    let json = std::fs::read_to_string(&opts.part)
        .with_context(|| format!("reading {}", opts.part.display()))?;
    let kernel = AnalyticKernel::from_json(&json)
        .with_context(|| format!("building solid from {}", opts.part.display()))?;
    let result = Analyzer::new(config)?.run(&kernel)?;
    if result.truncated {
        tracing::warn!("result is partial, a budget was exhausted");
    }
    Ok(result)
}

fn show_info(path: &Path, result: &AnalyzeResult) {
    let s = &result.summary;
    println!("part: {}", path.display());
    println!("  Volume: {:.3} cm³", result.volume_cm3());
    println!("  Surface area: {:.1} mm²", result.surface_area_mm2);
    let [x, y, z] = result.bounding_box.size;
    println!("  Size: {x:.2} x {y:.2} x {z:.2} mm");
    println!(
        "  Faces: {} ({} planar, {} cylindrical)",
        s.face_counts.total, s.face_counts.planar, s.face_counts.cylindrical
    );
    println!("  Complexity: {}/10", s.complexity_score);

    if !result.features.is_empty() {
        println!("\nFeatures:");
        for (i, feature) in result.features.iter().enumerate() {
            let orientation = feature.orientation().map_or("-", |o| o.as_str());
            println!(
                "  {}: {} [{}] {:.1} mm²",
                i + 1,
                feature.kind_name(),
                orientation,
                feature.area_mm2()
            );
        }
    }

    let d = &result.diagnostics;
    println!("\nMesh stats:");
    println!("  Total triangles: {}", result.mesh.triangle_count);
    println!("  Total vertices: {}", result.mesh.num_vertices());
    println!("  Feature edges: {}", result.feature_edges.len());
    println!(
        "\nStrategy {} in {} ms ({} propagation rounds)",
        d.strategy, d.elapsed_ms, d.propagation_iterations
    );
    if result.truncated {
        println!("  (truncated)");
    }
}

/// Binary STL. Each triangle's attribute word carries the label index of its
/// first vertex.
fn stl_bytes(mesh: &DisplayMesh) -> Vec<u8> {
    let num_triangles = mesh.triangle_count;
    let mut data = Vec::with_capacity(84 + num_triangles * 50);

    let mut header = [b' '; 80];
    let title = b"brepscan labeled mesh";
    header[..title.len()].copy_from_slice(title);
    data.extend_from_slice(&header);
    data.extend_from_slice(&(num_triangles as u32).to_le_bytes());

    let vertex = |i: u32| {
        let i = i as usize * 3;
        [mesh.vertices[i], mesh.vertices[i + 1], mesh.vertices[i + 2]]
    };
    for tri in mesh.indices.chunks_exact(3) {
        let (v0, v1, v2) = (vertex(tri[0]), vertex(tri[1]), vertex(tri[2]));

        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let nx = e1[1] * e2[2] - e1[2] * e2[1];
        let ny = e1[2] * e2[0] - e1[0] * e2[2];
        let nz = e1[0] * e2[1] - e1[1] * e2[0];
        let len = (nx * nx + ny * ny + nz * nz).sqrt();
        let n = if len > 1e-10 {
            [nx / len, ny / len, nz / len]
        } else {
            [0.0, 0.0, 1.0]
        };

        for c in n.into_iter().chain(v0).chain(v1).chain(v2) {
            data.extend_from_slice(&c.to_le_bytes());
        }
        let label = mesh.vertex_labels[tri[0] as usize].index() as u16;
        data.extend_from_slice(&label.to_le_bytes());
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use brepscan_kernel_analytic::{PartSpec, StockFace};

    #[test]
    fn test_stl_layout() {
        let part =
            PartSpec::block([50.0, 50.0, 10.0]).through_hole(StockFace::Top, [25.0, 25.0], 6.0);
        let kernel = AnalyticKernel::new(part).unwrap();
        let result = Analyzer::default().run(&kernel).unwrap();
        let bytes = stl_bytes(&result.mesh);
        assert_eq!(bytes.len(), 84 + 50 * result.mesh.triangle_count);
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
        assert_eq!(count as usize, result.mesh.triangle_count);
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "brepscan",
            "info",
            "part.json",
            "--quality",
            "fast",
            "--strategy",
            "center-distance",
        ])
        .unwrap();
        let Commands::Info { opts } = cli.command else {
            panic!("expected info");
        };
        let config = load_config(&opts).unwrap();
        assert_eq!(config.mesh.quality, MeshQuality::Fast);
        assert_eq!(config.topology.strategy, ClassifierStrategy::CenterDistance);
    }
}
