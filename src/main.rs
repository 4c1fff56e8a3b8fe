use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use deepfeatx::{
    download_dataset, DirectoryOptions, ExtractionOutput, ImageFeatureExtractor,
    ImageInitOptions, TargetShape,
};
use env_logger::Env;
use log::info;

#[derive(Parser, Debug)]
#[clap(about = "Extract deep image features with a pretrained backbone")]
struct Arguments {
    /// Backbone name
    #[clap(short = 'm', long = "model", default_value = "resnet")]
    model: String,
    /// Side of the square center crop fed to the backbone
    #[clap(short = 's', long = "target-size", default_value_t = 224)]
    target_size: u32,
    /// Model cache directory, defaults to DEEPFEATX_CACHE_DIR or .deepfeatx_cache
    #[clap(long = "cache-dir")]
    cache_dir: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the feature vector of one image (path or http(s) URL) as a JSON array
    Embed { source: String },
    /// Print the features of every image in a directory as JSON lines
    Extract {
        directory: PathBuf,
        #[clap(short = 'b', long = "batch-size", default_value_t = 32)]
        batch_size: usize,
        /// Images sit directly in the directory instead of one subfolder per class
        #[clap(long = "flat")]
        flat: bool,
        /// Add the class name (subfolder) to every row
        #[clap(long = "class-names")]
        class_names: bool,
        /// Print bare vectors instead of table rows
        #[clap(long = "matrix")]
        matrix: bool,
    },
    /// Download and unpack a dataset archive into the current directory
    Download { url: String, archive: String },
}

fn load_extractor(arguments: &Arguments) -> anyhow::Result<ImageFeatureExtractor> {
    let mut options = ImageInitOptions::from_model_name(&arguments.model)?
        .with_target_shape(TargetShape::square(arguments.target_size));
    if let Some(cache_dir) = &arguments.cache_dir {
        options = options.with_cache_dir(cache_dir.clone());
    }
    ImageFeatureExtractor::try_new(options)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let arguments = Arguments::parse();

    match &arguments.command {
        Command::Embed { source } => {
            let extractor = load_extractor(&arguments)?;
            let vector = if source.starts_with("http://") || source.starts_with("https://") {
                extractor.embed_from_url(source)?
            } else {
                extractor.embed_from_path(source)?
            };
            println!("{}", serde_json::to_string(&vector)?);
        }
        Command::Extract {
            directory,
            batch_size,
            flat,
            class_names,
            matrix,
        } => {
            let extractor = load_extractor(&arguments)?;
            let options = DirectoryOptions::default()
                .with_batch_size(*batch_size)
                .with_classes_as_folders(!flat)
                .with_export_class_names(*class_names)
                .with_export_as_table(!matrix);
            let output = extractor.extract_from_directory(directory, options)?;

            let mut stdout = BufWriter::new(io::stdout().lock());
            match output {
                ExtractionOutput::Table(table) => {
                    info!("Extracted {} rows of {} features", table.len(), table.dim());
                    table.write_json_lines(&mut stdout)?;
                }
                ExtractionOutput::Matrix(matrix) => {
                    for row in matrix.rows() {
                        serde_json::to_writer(&mut stdout, &row.to_vec())?;
                        stdout.write_all(b"\n")?;
                    }
                }
            }
            stdout.flush()?;
        }
        Command::Download { url, archive } => download_dataset(url, archive),
    }
    Ok(())
}
