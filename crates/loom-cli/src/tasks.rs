//! loom に同梱するタスク

use std::sync::Arc;

use async_trait::async_trait;
use loom_core::channel::{StderrWriter, StdinReader, StdoutWriter};
use loom_core::task::{Typed, TypedHandler};
use loom_core::{
    Effect, InputBinding, OutputBinding, ParameterSpec, Params, SchemaDocument, TaskError,
    TaskOutput, TaskSpec, Value,
};
use serde::{Deserialize, Serialize};

/// `loom add 2 3` → `5`
pub fn add() -> TaskSpec {
    TaskSpec::from_fn(|params: Params, _input, effect: Arc<Effect>| async move {
        let a = params.number("a")?;
        let b = params.number("b")?;
        effect.debug(format_args!("{a} + {b}"));
        Ok::<_, TaskError>(TaskOutput::single(a + b))
    })
    .about("Add two numbers")
    .param(ParameterSpec::number("a").describe("left operand"))
    .param(ParameterSpec::number("b").describe("right operand"))
    .output(OutputBinding::json(SchemaDocument::number(), StdoutWriter))
}

/// stdin の JSON 文字列をそのまま stdout へ
pub fn echo() -> TaskSpec {
    TaskSpec::from_fn(|_params, input: Value, _effect| async move {
        Ok(TaskOutput::single(input))
    })
    .about("Echo a JSON string from stdin")
    .input(InputBinding::json(SchemaDocument::string(), StdinReader))
    .output(OutputBinding::json(SchemaDocument::string(), StdoutWriter))
}

/// YAML の `{ name: ... }` を読んで挨拶する
pub fn greet() -> TaskSpec {
    TaskSpec::from_fn(|params: Params, input: Value, _effect| async move {
        let greeting = params.text("greeting")?;
        let name = input
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("stranger");
        Ok::<_, TaskError>(TaskOutput::single(format!("{greeting}, {name}!\n")))
    })
    .about("Greet the person described by a YAML document on stdin")
    .param(
        ParameterSpec::text("greeting")
            .short('g')
            .describe("word to greet with")
            .default_value("Hello"),
    )
    .input(InputBinding::yaml(
        SchemaDocument::object([("name", SchemaDocument::string().describe("who to greet"))]),
        StdinReader,
    ))
    .output(OutputBinding::text(StdoutWriter))
}

/// シェルコマンドを実行して stdout を返す
pub fn sh() -> TaskSpec {
    TaskSpec::from_fn(|params: Params, _input, effect: Arc<Effect>| async move {
        let command = params.text("command")?;
        let stdout = match params.optional_text("dir")? {
            Some(dir) => effect.execute_in(dir, command).await?,
            None => effect.execute(command).await?,
        };
        Ok::<_, TaskError>(TaskOutput::single(stdout))
    })
    .about("Run a shell command and print its standard output")
    .param(ParameterSpec::text("command").describe("command line passed to the shell"))
    .param(
        ParameterSpec::text("dir")
            .short('C')
            .describe("working directory"),
    )
    .output(OutputBinding::text(StdoutWriter))
}

/// stdin の行を JSON 配列にし、行数を stderr に出す
pub fn lines() -> TaskSpec {
    TaskSpec::from_fn(|_params, input: Value, _effect| async move {
        let text = input.as_str().unwrap_or_default();
        let lines: Vec<Value> = text.lines().map(Value::from).collect();
        let count = lines.len() as f64;
        Ok(TaskOutput::single(lines).with("count", count))
    })
    .about("Split stdin into a JSON array of lines; the line count goes to stderr")
    .input(InputBinding::text(StdinReader))
    .output(OutputBinding::json(
        SchemaDocument::array(SchemaDocument::string()),
        StdoutWriter,
    ))
    .named_output(
        "count",
        OutputBinding::json(SchemaDocument::number(), StderrWriter),
    )
}

#[derive(Debug, Deserialize)]
struct Sample {
    values: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct Summary {
    count: usize,
    sum: f64,
    mean: f64,
}

struct StatsHandler;

#[async_trait]
impl TypedHandler for StatsHandler {
    type Input = Sample;
    type Output = Summary;

    async fn handle(
        &self,
        _params: Params,
        sample: Sample,
        effect: Arc<Effect>,
    ) -> Result<Summary, TaskError> {
        if sample.values.is_empty() {
            return Err(TaskError::failed("no values to summarise"));
        }
        let count = sample.values.len();
        let sum: f64 = sample.values.iter().sum();
        effect.info(format_args!("summarised {count} values"));
        Ok(Summary {
            count,
            sum,
            mean: sum / count as f64,
        })
    }
}

/// `{ "values": [..] }` の件数・合計・平均
pub fn stats() -> TaskSpec {
    TaskSpec::new(Typed::new(StatsHandler))
        .about("Summarise a JSON list of numbers")
        .input(InputBinding::json(
            SchemaDocument::object([(
                "values",
                SchemaDocument::array(SchemaDocument::number()),
            )]),
            StdinReader,
        ))
        .output(OutputBinding::json(
            SchemaDocument::object([
                ("count", SchemaDocument::number()),
                ("sum", SchemaDocument::number()),
                ("mean", SchemaDocument::number()),
            ]),
            StdoutWriter,
        ))
}
