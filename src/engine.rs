use crate::config::ReferencePlane;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

pub const AREA_2D_KEY: &str = "2D Area=";
pub const AREA_3D_KEY: &str = "3D Area=";
pub const VOLUME_KEY: &str = "Volume=";

pub const DEFAULT_ENGINE_ARGS: [&str; 4] = ["{dem}", "{plane}", "{elevation}", "{z_factor}"];

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start surface-volume engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("surface-volume engine exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("missing `{key}` in engine message: {message:?}")]
    MissingField { key: &'static str, message: String },
    #[error("unparsable value {value:?} after `{key}` in engine message")]
    BadNumber { key: &'static str, value: String },
}

// One surface-volume evaluation of a DEM against a horizontal plane
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceVolumeRequest<'a> {
    pub dem: &'a Path,
    pub plane: ReferencePlane,
    pub elevation_m: f64,
    pub z_factor: f64,
}

/// Anything that can compute area and volume for a DEM and report it as the
/// free-text status message the lookup loop parses.
pub trait SurfaceVolumeEngine {
    fn surface_volume(&mut self, request: &SurfaceVolumeRequest) -> Result<String, EngineError>;
}

// Values reported by the engine, in square and cubic meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceVolume {
    pub area_2d_m2: f64,
    pub area_3d_m2: f64,
    pub volume_m3: f64,
}

impl SurfaceVolume {
    pub fn parse(message: &str) -> Result<Self, EngineError> {
        Ok(SurfaceVolume {
            area_2d_m2: field_after(message, AREA_2D_KEY)?,
            area_3d_m2: field_after(message, AREA_3D_KEY)?,
            volume_m3: field_after(message, VOLUME_KEY)?,
        })
    }
}

fn field_after(message: &str, key: &'static str) -> Result<f64, EngineError> {
    let start = message
        .find(key)
        .map(|pos| pos + key.len())
        .ok_or_else(|| EngineError::MissingField {
            key,
            message: message.to_string(),
        })?;

    let token = message[start..]
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .next()
        .unwrap_or_default();

    token.parse::<f64>().map_err(|_| EngineError::BadNumber {
        key,
        value: token.to_string(),
    })
}

// Runs an external program once per stage; its stdout is the status message
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let args = if args.is_empty() {
            DEFAULT_ENGINE_ARGS.iter().map(|a| a.to_string()).collect()
        } else {
            args
        };
        CommandEngine {
            program: program.into(),
            args,
        }
    }

    fn expand_args(&self, request: &SurfaceVolumeRequest) -> Vec<String> {
        let dem = request.dem.display().to_string();
        let plane = request.plane.to_string();
        let elevation = request.elevation_m.to_string();
        let z_factor = request.z_factor.to_string();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{dem}", &dem)
                    .replace("{plane}", &plane)
                    .replace("{elevation}", &elevation)
                    .replace("{z_factor}", &z_factor)
            })
            .collect()
    }
}

impl SurfaceVolumeEngine for CommandEngine {
    fn surface_volume(&mut self, request: &SurfaceVolumeRequest) -> Result<String, EngineError> {
        let args = self.expand_args(request);
        tracing::trace!(program = %self.program.display(), ?args, "running engine");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| EngineError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MESSAGE: &str = "Reference Plane = BELOW 1261.95; Z Factor = 1; \
                           2D Area= 4031905.25 3D Area= 4032511.8 Volume= 654471.3";

    #[test]
    fn parses_all_three_fields() {
        let result = SurfaceVolume::parse(MESSAGE).unwrap();
        assert_relative_eq!(result.area_2d_m2, 4031905.25);
        assert_relative_eq!(result.area_3d_m2, 4032511.8);
        assert_relative_eq!(result.volume_m3, 654471.3);
    }

    #[test]
    fn tolerates_separators_and_exponents() {
        let result =
            SurfaceVolume::parse("2D Area=1.5e3, 3D Area=  1600;Volume=0\r\n").unwrap();
        assert_relative_eq!(result.area_2d_m2, 1500.0);
        assert_relative_eq!(result.area_3d_m2, 1600.0);
        assert_relative_eq!(result.volume_m3, 0.0);
    }

    #[test]
    fn missing_volume_is_an_error() {
        let err = SurfaceVolume::parse("2D Area= 1 3D Area= 2").unwrap_err();
        assert!(matches!(err, EngineError::MissingField { key: VOLUME_KEY, .. }));
    }

    #[test]
    fn non_numeric_value_is_an_error() {
        let err = SurfaceVolume::parse("2D Area= n/a 3D Area= 2 Volume= 3").unwrap_err();
        match err {
            EngineError::BadNumber { key, value } => {
                assert_eq!(key, AREA_2D_KEY);
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_message_is_an_error() {
        assert!(SurfaceVolume::parse("").is_err());
    }

    #[test]
    fn default_template_substitutes_request() {
        let engine = CommandEngine::new("surface-volume", Vec::new());
        let request = SurfaceVolumeRequest {
            dem: Path::new("dems/p27_5mdem88"),
            plane: ReferencePlane::Below,
            elevation_m: 1261.5,
            z_factor: 1.0,
        };
        assert_eq!(
            engine.expand_args(&request),
            vec!["dems/p27_5mdem88", "BELOW", "1261.5", "1"]
        );
    }

    #[test]
    fn custom_template_keeps_literal_args() {
        let engine = CommandEngine::new(
            "python",
            vec![
                "surface_volume.py".to_string(),
                "--in={dem}".to_string(),
                "--plane={plane}".to_string(),
                "--height".to_string(),
                "{elevation}".to_string(),
            ],
        );
        let request = SurfaceVolumeRequest {
            dem: Path::new("p9"),
            plane: ReferencePlane::Above,
            elevation_m: 3.25,
            z_factor: 0.3048,
        };
        assert_eq!(
            engine.expand_args(&request),
            vec!["surface_volume.py", "--in=p9", "--plane=ABOVE", "--height", "3.25"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_engine_captures_stdout() {
        let mut engine = CommandEngine::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo \"plane $1 2D Area= 100 3D Area= 110 Volume= $2\"".to_string(),
                "sh".to_string(),
                "{plane}".to_string(),
                "{elevation}".to_string(),
            ],
        );
        let request = SurfaceVolumeRequest {
            dem: Path::new("unused"),
            plane: ReferencePlane::Below,
            elevation_m: 42.5,
            z_factor: 1.0,
        };
        let message = engine.surface_volume(&request).unwrap();
        assert_eq!(message, "plane BELOW 2D Area= 100 3D Area= 110 Volume= 42.5");
        assert_relative_eq!(SurfaceVolume::parse(&message).unwrap().volume_m3, 42.5);
    }

    #[cfg(unix)]
    #[test]
    fn command_engine_reports_failure_status() {
        let mut engine = CommandEngine::new(
            "sh",
            vec!["-c".to_string(), "echo 'no license' >&2; exit 3".to_string()],
        );
        let request = SurfaceVolumeRequest {
            dem: Path::new("unused"),
            plane: ReferencePlane::Below,
            elevation_m: 1.0,
            z_factor: 1.0,
        };
        match engine.surface_volume(&request).unwrap_err() {
            EngineError::Failed { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "no license");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let mut engine = CommandEngine::new("./no-such-surface-volume-engine", Vec::new());
        let request = SurfaceVolumeRequest {
            dem: Path::new("p1"),
            plane: ReferencePlane::Below,
            elevation_m: 1.0,
            z_factor: 1.0,
        };
        assert!(matches!(
            engine.surface_volume(&request),
            Err(EngineError::Spawn { .. })
        ));
    }
}
