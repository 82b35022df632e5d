pub mod eval;
pub mod generate;
pub mod inspect;

use std::path::{Path, PathBuf};
use std::process;

use lutgen::config::Config;
use lutgen::diagnostic::Diagnostic;
use lutgen::{GenError, Model};

/// A model file together with its text, kept for error rendering.
pub struct LoadedModel {
    pub path: PathBuf,
    pub source: String,
    pub model: Model,
}

impl LoadedModel {
    pub fn filename(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    /// Render `err` against this model file and exit.
    pub fn fail(&self, err: &GenError) -> ! {
        Diagnostic::from_error(err, &self.source).render(&self.filename(), &self.source);
        process::exit(1);
    }
}

/// Read and parse a model file, exiting with a rendered diagnostic on error.
pub fn load_model(path: &Path) -> LoadedModel {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    };
    let model = match Model::from_json(&source) {
        Ok(model) => model,
        Err(e) => {
            let filename = path.to_string_lossy();
            Diagnostic::from_error(&e, &source).render(&filename, &source);
            process::exit(1);
        }
    };
    LoadedModel {
        path: path.to_path_buf(),
        source,
        model,
    }
}

/// Load `explicit` if given, else discover a config next to the model.
pub fn load_config(model_path: &Path, explicit: Option<&Path>) -> Config {
    let result = match explicit {
        Some(path) => Config::load(path),
        None => Config::discover(model_path.parent().unwrap_or(Path::new("."))),
    };
    match result {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
