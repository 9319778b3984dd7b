use aqua_data::object_data::AquaObject;
use aqua_data::AquaData;
use log::{error, info};
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn parse_and_write_json(input: &Path, output: &Path, split: bool) {
    let parse_start_time = Instant::now();
    let mut object = match AquaObject::from_file(input) {
        Ok(object) => object,
        Err(e) => {
            error!("Failed to read {:?}: {}", input, e);
            return;
        }
    };
    info!("Parse: {:?}", parse_start_time.elapsed());
    info!(
        "{} vertices, {} strip indices",
        object.vertex_count(),
        object.strip_index_count()
    );

    if split {
        if let Err(e) = object.split_vertex_sets_per_mesh() {
            error!("Failed to split vertex sets: {}", e);
            return;
        }
    }

    let json = match serde_json::to_string_pretty(&object) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize {:?}: {}", input, e);
            return;
        }
    };

    let result =
        std::fs::File::create(output).and_then(|mut file| file.write_all(json.as_bytes()));
    if let Err(e) = result {
        error!("Failed to write {:?}: {}", output, e);
    }
}

fn deserialize_and_save(input: &Path, output: &Option<PathBuf>) {
    let json = match std::fs::read_to_string(input) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to read {:?}: {}", input, e);
            return;
        }
    };

    let object = match serde_json::from_str::<AquaObject>(&json) {
        Ok(object) => object,
        Err(e) => {
            error!("Failed to deserialize {:?}: {}", input, e);
            return;
        }
    };

    let output_path = output
        .clone()
        .unwrap_or_else(|| input.with_extension("aqo"));
    if let Err(e) = object.write_to_file(&output_path) {
        error!("Failed to write {:?}: {}", output_path, e);
    }
}

fn main() {
    env_logger::init();

    let split = env::args().any(|a| a == "--split");
    let args: Vec<String> = env::args().filter(|a| a != "--split").collect();
    let input = match args.get(1) {
        Some(input) => input,
        None => {
            eprintln!("Usage:");
            eprintln!("\taqua_data_json <file> [--split]");
            eprintln!("\taqua_data_json <file> <json output> [--split]");
            eprintln!("\taqua_data_json <json file> [model output]");
            return;
        }
    };
    let input_path = Path::new(input);

    match input_path.extension().and_then(|e| e.to_str()) {
        Some("json") => deserialize_and_save(input_path, &args.get(2).map(PathBuf::from)),
        _ => {
            // Modify the input if no output is specified to allow dragging a file onto the executable.
            let output_path = args
                .get(2)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(input.to_string() + ".json"));
            parse_and_write_json(input_path, &output_path, split);
        }
    }
}
