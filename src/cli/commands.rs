use crate::core::transform::TransformPipeline;
use crate::css::CssAsset;
use crate::transforms::{CssModulesTransform, MinifyTransform};
use crate::utils::{Logger, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Cinder - CSS asset pipeline for modern web bundlers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a CSS asset through the full pipeline
    Build {
        /// CSS file to process
        file: PathBuf,
        /// Output directory (prints to stdout when omitted)
        #[arg(short, long)]
        outdir: Option<PathBuf>,
        /// Disable minification
        #[arg(long)]
        no_minify: bool,
    },
    /// List the dependencies of a CSS asset
    Deps {
        /// CSS file to inspect
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show pipeline information
    Info,
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> Result<()> {
        Logger::init();

        let cli = Cli::parse();

        match cli.command {
            Commands::Build {
                file,
                outdir,
                no_minify,
            } => self.handle_build(file, outdir, no_minify).await,
            Commands::Deps { file, json } => self.handle_deps(file, json).await,
            Commands::Info => {
                self.handle_info();
                Ok(())
            }
        }
    }

    async fn handle_build(
        &self,
        file: PathBuf,
        outdir: Option<PathBuf>,
        no_minify: bool,
    ) -> Result<()> {
        let mut asset = CssAsset::load(&file).await?;

        let mut pipeline = TransformPipeline::new();
        pipeline.register(Arc::new(CssModulesTransform::new()));
        if !no_minify {
            pipeline.register(Arc::new(MinifyTransform::new()));
        }

        let output = asset.process(&pipeline).await?;

        match outdir {
            Some(outdir) => {
                tokio::fs::create_dir_all(&outdir).await?;
                let name = file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("bundle.css");
                let css_path = outdir.join(name);
                tokio::fs::write(&css_path, &output.css).await?;
                if !output.js.is_empty() {
                    tokio::fs::write(outdir.join(format!("{}.js", name)), &output.js).await?;
                }
                println!("📦 Wrote {}", css_path.display());
            }
            None => println!("{}", output.css),
        }
        Ok(())
    }

    async fn handle_deps(&self, file: PathBuf, json: bool) -> Result<()> {
        let mut asset = CssAsset::load(&file).await?;

        if asset.might_have_dependencies() {
            asset.parse()?;
            asset.collect_dependencies()?;
        }

        if json {
            println!("{}", serde_json::to_string_pretty(asset.dependencies())?);
        } else {
            for dep in asset.dependencies() {
                match dep.media() {
                    Some(media) if !media.is_empty() => {
                        println!("{} (media: {})", dep.specifier, media)
                    }
                    _ => println!("{}", dep.specifier),
                }
            }
        }
        Ok(())
    }

    fn handle_info(&self) {
        println!("🎨 Cinder CSS asset pipeline");
        println!("  • @import extraction with media qualifiers");
        println!("  • url() rewriting to content-addressed names");
        println!("  • CSS modules scoping for *.module.css");
        println!("  • Lightning CSS minification");
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}
