use std::path::PathBuf;

use vragent::IdKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    Run,
    Check,
    Remove,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub(crate) scene: Option<PathBuf>,
    pub(crate) plan: Option<PathBuf>,
    pub(crate) id_kind: Option<IdKind>,
    pub(crate) exit_after_testing: bool,
    pub(crate) max_ticks: Option<u64>,
    pub(crate) realtime: bool,
    pub(crate) export_log: Option<PathBuf>,
    pub(crate) log_prefix: Option<String>,
    pub(crate) errors_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliCommand {
    pub(crate) kind: CommandKind,
    pub(crate) options: CliOptions,
}

/// `Ok(None)` means help was requested.
pub(crate) fn parse_args(args: &[String]) -> Result<Option<CliCommand>, String> {
    let Some(first) = args.first() else {
        return Err("missing subcommand".to_string());
    };
    if first == "-h" || first == "--help" {
        return Ok(None);
    }

    let kind = match first.as_str() {
        "run" => CommandKind::Run,
        "check" => CommandKind::Check,
        "remove" => CommandKind::Remove,
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    let mut options = CliOptions::default();
    let mut index = 1usize;
    while index < args.len() {
        let flag = args[index].as_str();
        let value = || {
            args.get(index + 1)
                .ok_or_else(|| format!("missing value for {flag}"))
        };
        match flag {
            "--scene" => {
                options.scene = Some(PathBuf::from(value()?));
                index += 2;
            }
            "--plan" => {
                options.plan = Some(PathBuf::from(value()?));
                index += 2;
            }
            "--id-kind" => {
                let raw = value()?;
                options.id_kind = Some(
                    raw.parse::<IdKind>()
                        .map_err(|reason| format!("invalid --id-kind value '{raw}': {reason}"))?,
                );
                index += 2;
            }
            "--guid" => {
                options.id_kind = Some(IdKind::Guid);
                index += 1;
            }
            "--exit-after-testing" => {
                options.exit_after_testing = true;
                index += 1;
            }
            "--max-ticks" => {
                let raw = value()?;
                options.max_ticks = Some(
                    raw.parse::<u64>()
                        .map_err(|_| format!("invalid --max-ticks value '{raw}' (expected u64)"))?,
                );
                index += 2;
            }
            "--realtime" => {
                options.realtime = true;
                index += 1;
            }
            "--export-log" => {
                options.export_log = Some(PathBuf::from(value()?));
                index += 2;
            }
            "--log-prefix" => {
                options.log_prefix = Some(value()?.clone());
                index += 2;
            }
            "--errors-only" => {
                options.errors_only = true;
                index += 1;
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    if options.scene.is_none() {
        return Err("--scene <path> is required".to_string());
    }
    if kind != CommandKind::Run && (options.max_ticks.is_some() || options.realtime) {
        return Err("--max-ticks and --realtime only apply to run".to_string());
    }

    Ok(Some(CliCommand { kind, options }))
}

pub(crate) fn usage_text() -> String {
    [
        "vragent - headless VR interaction test agent",
        "",
        "Usage:",
        "  vragent run --scene <file> [--plan <file>] [--id-kind file_id|guid] [--guid]",
        "              [--exit-after-testing] [--max-ticks <u64>] [--realtime]",
        "              [--export-log <dir>] [--log-prefix <text>] [--errors-only]",
        "  vragent check --scene <file> [--plan <file>] [--id-kind file_id|guid] [--guid]",
        "  vragent remove --scene <file> [--plan <file>] [--id-kind file_id|guid] [--guid]",
        "",
        "Environment:",
        "  VRAGENT_TEST_PLAN            plan path (default test_plan.json)",
        "  VRAGENT_ID_KIND              file_id or guid",
        "  VRAGENT_EXIT_AFTER_TESTING   1/true to stop after one pass",
        "  VRAGENT_IDLE_TICKS           ticks yielded between tasks (default 30)",
        "  RUST_LOG                     tracing filter (default info)",
    ]
    .join("\n")
}
