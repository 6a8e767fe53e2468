use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::desktop::Rect;
use crate::error::CliError;
use crate::launch::LauncherConfig;
use crate::settings::{ExecutableSettings, WindowPlacementData, WindowStyle};

/// What the invocation asks for. Without an explicit command every registered
/// executable is started.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    Run,
    List,
    Add(AddRequest),
    Remove(u32),
    Move { process: String, rect: Rect },
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub path: PathBuf,
    pub arguments: Option<String>,
    pub style: WindowStyle,
    pub skip: Option<u32>,
    pub style_skipped: bool,
    pub placement: Option<WindowPlacementData>,
}

impl AddRequest {
    /// Settings for the new entry. Asking for a skip count or a placement
    /// turns on advanced handling.
    pub fn settings(&self) -> ExecutableSettings {
        if self.skip.is_none() && self.placement.is_none() {
            return ExecutableSettings::basic(None, self.style);
        }
        ExecutableSettings::advanced(
            None,
            self.style,
            self.skip.unwrap_or(0),
            self.style_skipped,
            self.placement,
        )
    }
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct CommandLineOptions {
    pub config: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub poll_ms: Option<u64>,
    pub verbose: bool,
    pub command: Command,
}

impl CommandLineOptions {
    pub fn launcher_config(&self) -> LauncherConfig {
        let mut config = LauncherConfig::default();
        if let Some(secs) = self.timeout_secs {
            config.resolve_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.poll_ms {
            config.poll_interval = Duration::from_millis(ms.max(1));
        }
        config
    }
}

impl std::fmt::Display for CommandLineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CommandLineOptions {{
    config: {:?},
    timeout_secs: {:?},
    poll_ms: {:?},
    verbose: {},
    command: {:?}
}}",
            self.config, self.timeout_secs, self.poll_ms, self.verbose, self.command
        )
    }
}

pub fn parse_command_line() -> Result<CommandLineOptions, CliError> {
    parse_args(env::args_os().skip(1))
}

pub fn parse_args<I>(args: I) -> Result<CommandLineOptions, CliError>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut options = CommandLineOptions::default();
    let mut add_path: Option<PathBuf> = None;
    let mut arguments = None;
    let mut style = WindowStyle::default();
    let mut skip = None;
    let mut style_skipped = false;
    let mut placement = None;

    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy();

        match arg_str.as_ref() {
            "--version" | "-V" => options.command = Command::Version,
            "-v" | "--verbose" => options.verbose = true,
            "-c" | "--config" => options.config = Some(next_value(&mut args, &arg_str)?.into()),
            "-t" | "--timeout" => {
                options.timeout_secs = Some(parse_value(&mut args, &arg_str)?);
            }
            "--poll" => options.poll_ms = Some(parse_value(&mut args, &arg_str)?),
            "-l" | "--list" => options.command = Command::List,
            "--add" => add_path = Some(next_value(&mut args, &arg_str)?.into()),
            "--args" => arguments = Some(next_value(&mut args, &arg_str)?),
            "--style" => style = parse_value(&mut args, &arg_str)?,
            "--skip" => skip = Some(parse_value(&mut args, &arg_str)?),
            "--style-skipped" => style_skipped = true,
            "--place" => {
                let value = next_value(&mut args, &arg_str)?;
                placement = Some(parse_placement(&value).ok_or_else(|| {
                    CliError::InvalidValue {
                        flag: arg_str.to_string(),
                        value,
                    }
                })?);
            }
            "--remove" => options.command = Command::Remove(parse_value(&mut args, &arg_str)?),
            "--move" => {
                let process = next_value(&mut args, &arg_str)?;
                let x = parse_value(&mut args, &arg_str)?;
                let y = parse_value(&mut args, &arg_str)?;
                let w = parse_value(&mut args, &arg_str)?;
                let h = parse_value(&mut args, &arg_str)?;
                options.command = Command::Move {
                    process,
                    rect: Rect::from_origin_size(x, y, w, h),
                };
            }
            other => return Err(CliError::UnknownArgument(other.to_string())),
        }
    }

    if let Some(path) = add_path {
        options.command = Command::Add(AddRequest {
            path,
            arguments,
            style,
            skip,
            style_skipped,
            placement,
        });
    }
    Ok(options)
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String, CliError> {
    args.next()
        .map(|value| value.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::MissingValue {
            flag: flag.to_string(),
        })
}

fn parse_value<T: FromStr>(
    args: &mut impl Iterator<Item = OsString>,
    flag: &str,
) -> Result<T, CliError> {
    let value = next_value(args, flag)?;
    value.trim().parse().map_err(|_| CliError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}

/// `screen,x,y,w,h`
fn parse_placement(value: &str) -> Option<WindowPlacementData> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<i32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [screen, x, y, w, h] => Some(WindowPlacementData::new(*x, *y, *w, *h, *screen)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CommandLineOptions, CliError> {
        parse_args(args.iter().map(OsString::from))
    }

    #[test]
    fn test_no_arguments_runs_everything() {
        let options = parse(&[]).unwrap();
        assert_eq!(options.command, Command::Run);
        assert_eq!(options.launcher_config(), LauncherConfig::default());
    }

    #[test]
    fn test_timing_flags_reach_launcher_config() {
        let options = parse(&["--timeout", "5", "--poll", "250", "-v"]).unwrap();
        let config = options.launcher_config();
        assert_eq!(config.resolve_timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(options.verbose);
    }

    #[test]
    fn test_add_with_placement_is_advanced() {
        let options = parse(&[
            "--add",
            r"C:\Tools\editor.exe",
            "--args",
            "--new-window",
            "--style",
            "max",
            "--skip",
            "1",
            "--place",
            "1,100,-50,800,600",
        ])
        .unwrap();

        let Command::Add(request) = options.command else {
            panic!("expected add, got {:?}", options.command);
        };
        assert_eq!(request.arguments.as_deref(), Some("--new-window"));
        let settings = request.settings();
        assert!(settings.advanced_handling);
        assert!(settings.custom_positioning);
        assert_eq!(settings.window_style, WindowStyle::Maximized);
        assert_eq!(settings.skip_amount_of_windows, 1);
        let placement = settings.effective_placement().unwrap();
        assert_eq!(placement.screen_index(), 1);
        assert_eq!((placement.x(), placement.y()), (100, -50));
    }

    #[test]
    fn test_plain_add_is_basic() {
        let options = parse(&["--add", "notepad.exe"]).unwrap();
        let Command::Add(request) = options.command else {
            panic!("expected add");
        };
        assert!(!request.settings().advanced_handling);
    }

    #[test]
    fn test_move_command() {
        let options = parse(&["--move", "chat", "-1280", "0", "640", "480"]).unwrap();
        assert_eq!(
            options.command,
            Command::Move {
                process: "chat".to_string(),
                rect: Rect::from_origin_size(-1280, 0, 640, 480),
            }
        );
    }

    #[test]
    fn test_bad_input_is_reported() {
        assert!(matches!(
            parse(&["--timeout"]),
            Err(CliError::MissingValue { .. })
        ));
        assert!(matches!(
            parse(&["--remove", "abc"]),
            Err(CliError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&["--add", "a.exe", "--place", "1,2,3"]),
            Err(CliError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&["--frobnicate"]),
            Err(CliError::UnknownArgument(_))
        ));
    }
}
