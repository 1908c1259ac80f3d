use argh::FromArgs;
use std::path::PathBuf;

use recon_io::{InputData, OutputData};

#[derive(FromArgs)]
/// Convert a reconstruction dataset to RMV
struct Args {
    /// path to the input dataset, a file or a directory
    #[argh(option)]
    input: PathBuf,

    /// path to the output .rmv file
    #[argh(option)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = argh::from_env();

    let input = InputData::new(&args.input);
    log::info!("Input: {} ({})", input.info(), input.format());

    // check the output before reading anything
    let output = args.output.map(OutputData::new);
    if let Some(output) = &output {
        if !output.is_valid() {
            return Err(format!("Unsupported output file: {}", output.path().display()).into());
        }
    }

    let cloud = input.load_point_cloud()?;
    println!(
        "Loaded #{} textures and #{} points",
        cloud.textures().len(),
        cloud.len()
    );

    if let Some(output) = output {
        output.write(&mut cloud.source())?;
        println!("Written to {}", output.info());
    }

    Ok(())
}
