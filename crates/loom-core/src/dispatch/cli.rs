//! TaskRegistry から clap の Command を組み立てる
//!
//! タスクは実行時に登録されるので derive ではなく builder API を使う。
//! サブコマンドはタスク名順。

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use serde_json::json;

use crate::app::App;
use crate::task::{ParamKind, ParamStyle, ParameterSpec, Params, Task};

/// 各タスクに付く組み込みフラグ（`--schema`）の id
pub(crate) const SCHEMA_FLAG: &str = "schema";

pub(crate) fn root_command(app: &App) -> Command {
    let mut command = Command::new(app.program().to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .allow_external_subcommands(true);

    if let Some(about) = app.about() {
        command = command.about(about.to_string());
    }
    command = match app.version() {
        Some(version) => command.version(version.to_string()),
        None => command.disable_version_flag(true),
    };

    for task in app.tasks().tasks() {
        command = command.subcommand(task_command(task));
    }
    command
}

fn task_command(task: &Task) -> Command {
    let mut command = Command::new(task.name().to_string()).arg(
        Arg::new(SCHEMA_FLAG)
            .long(SCHEMA_FLAG)
            .action(ArgAction::SetTrue)
            .help("Print the task's input and output schemas as JSON and exit"),
    );
    if let Some(about) = task.about() {
        command = command.about(about.to_string());
    }

    let mut index = 0;
    for param in task.params() {
        let arg = match param.style() {
            ParamStyle::Positional => {
                index += 1;
                param_arg(param).index(index)
            }
            ParamStyle::Option { long, short } => {
                let arg = param_arg(param).long(long.clone());
                match short {
                    Some(c) => arg.short(*c),
                    None => arg,
                }
            }
        };
        command = command.arg(arg);
    }
    command
}

fn param_arg(param: &ParameterSpec) -> Arg {
    let mut arg = Arg::new(param.name().to_string())
        .value_name(param.name().to_uppercase())
        .action(ArgAction::Set);

    arg = match param.kind() {
        ParamKind::Text => arg.value_parser(value_parser!(String)),
        ParamKind::Number => arg
            .value_parser(value_parser!(f64))
            .allow_negative_numbers(true),
    };
    if let Some(description) = param.description() {
        arg = arg.help(description.to_string());
    }
    if let Some(token) = param.default_token() {
        arg = arg.default_value(token.to_string());
    }
    if param.is_required() {
        arg = arg.required_unless_present(SCHEMA_FLAG);
    }
    arg
}

/// ArgMatches → Params（宣言順）
pub(crate) fn extract_params(task: &Task, matches: &ArgMatches) -> Params {
    let mut params = Params::new();
    for param in task.params() {
        match param.kind() {
            ParamKind::Text => {
                if let Some(text) = matches.get_one::<String>(param.name()) {
                    params.insert(param.name(), text.as_str());
                }
            }
            ParamKind::Number => {
                if let Some(number) = matches.get_one::<f64>(param.name()) {
                    params.insert(param.name(), *number);
                }
            }
        }
    }
    params
}

/// `--schema` の出力
///
/// output は宣言順を保つため配列にする。
pub(crate) fn schema_report(task: &Task) -> serde_json::Value {
    let input = task.input().map(|binding| {
        json!({
            "family": binding.family(),
            "schema": binding.schema(),
        })
    });
    let outputs: Vec<serde_json::Value> = task
        .outputs()
        .map(|(name, binding)| {
            json!({
                "name": name,
                "family": binding.family(),
                "schema": binding.schema(),
            })
        })
        .collect();

    json!({
        "task": task.name(),
        "input": input,
        "outputs": outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppBuilder;
    use crate::channel::{MemoryReader, MemoryWriter};
    use crate::schema::{SchemaDocument, Value};
    use crate::task::{InputBinding, OutputBinding, TaskOutput, TaskSpec};

    fn app() -> App {
        let noop = || TaskSpec::from_fn(|_, _, _| async { Ok(TaskOutput::none()) });
        AppBuilder::new("loom")
            .version("0.1.0")
            .task(
                "greet",
                noop()
                    .about("Say hello")
                    .param(ParameterSpec::text("name").describe("who to greet"))
                    .param(
                        ParameterSpec::text("greeting")
                            .short('g')
                            .default_value("hello"),
                    )
                    .param(ParameterSpec::number("times").option()),
            )
            .task(
                "add",
                noop()
                    .param(ParameterSpec::number("a"))
                    .param(ParameterSpec::number("b"))
                    .input(InputBinding::json(SchemaDocument::number(), MemoryReader::new("")))
                    .output(OutputBinding::json(SchemaDocument::number(), MemoryWriter::new())),
            )
            .build()
            .unwrap()
    }

    fn parse(app: &App, argv: &[&str]) -> (String, Params) {
        let matches = root_command(app).try_get_matches_from(argv).unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        let task = app.tasks().lookup(name).unwrap();
        (name.to_string(), extract_params(&task, sub))
    }

    #[test]
    fn subcommands_are_sorted() {
        let names: Vec<String> = root_command(&app())
            .get_subcommands()
            .map(|c| c.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["add", "greet"]);
    }

    #[test]
    fn positional_numbers() {
        let app = app();
        let (name, params) = parse(&app, &["loom", "add", "2", "-3.5"]);
        assert_eq!(name, "add");
        assert_eq!(params.number("a").unwrap(), 2.0);
        assert_eq!(params.number("b").unwrap(), -3.5);
    }

    #[test]
    fn options_and_defaults() {
        let app = app();
        let (_, params) = parse(&app, &["loom", "greet", "ada"]);
        assert_eq!(params.text("name").unwrap(), "ada");
        assert_eq!(params.text("greeting").unwrap(), "hello");
        assert!(params.get("times").is_none());

        let (_, params) = parse(&app, &["loom", "greet", "ada", "-g", "hi", "--times", "3"]);
        assert_eq!(params.text("greeting").unwrap(), "hi");
        assert_eq!(params.get("times"), Some(&Value::from(3)));
    }

    #[test]
    fn malformed_number_is_a_usage_error() {
        let err = root_command(&app())
            .try_get_matches_from(["loom", "add", "two", "3"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn schema_flag_waives_required_parameters() {
        let matches = root_command(&app())
            .try_get_matches_from(["loom", "add", "--schema"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert!(sub.get_flag(SCHEMA_FLAG));
    }

    #[test]
    fn unknown_subcommands_reach_the_dispatcher() {
        let matches = root_command(&app())
            .try_get_matches_from(["loom", "deploy", "now"])
            .unwrap();
        assert_eq!(matches.subcommand_name(), Some("deploy"));
    }

    #[test]
    fn schema_report_lists_bindings_in_order() {
        let app = app();
        let task = app.tasks().lookup("add").unwrap();
        let report = schema_report(&task);
        assert_eq!(report["input"]["family"], "json");
        assert_eq!(report["input"]["schema"]["type"], "number");
        assert_eq!(report["outputs"][0]["name"], "output");

        let greet = app.tasks().lookup("greet").unwrap();
        assert!(schema_report(&greet)["input"].is_null());
    }

    #[test]
    fn command_passes_clap_debug_asserts() {
        root_command(&app()).debug_assert();
    }
}
