//! Dispatcher integration tests
//!
//! メモリ / ファイルの Channel を使って、argv から output の書き出しまでを通しで確認する。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use loom_core::channel::{
    ChannelError, FileReader, FileWriter, MemoryReader, MemoryWriter, Writer,
};
use loom_core::codec::CodecRegistry;
use loom_core::schema::{SchemaPath, ValueKind};
use loom_core::{
    AppBuilder, DispatchState, Dispatcher, Effect, InputBinding, LoomError, OutputBinding,
    ParameterSpec, Params, RunOutcome, SchemaDocument, TaskError, TaskOutput, TaskSpec, Value,
};
use rstest::rstest;

fn identity() -> TaskSpec {
    TaskSpec::from_fn(|_, input: Value, _| async move { Ok(TaskOutput::single(input)) })
}

fn single_task(name: &str, spec: TaskSpec) -> Dispatcher {
    Dispatcher::new(AppBuilder::new("loom").task(name, spec).build().unwrap())
}

// =============================================================================
// Round trip
// =============================================================================

fn date(y: i32, m: u32, d: u32) -> Value {
    NaiveDate::from_ymd_opt(y, m, d).map(Value::from).unwrap()
}

fn object(fields: Vec<(&str, Value)>) -> Value {
    fields.into_iter().collect()
}

fn record_schema() -> SchemaDocument {
    SchemaDocument::object([
        ("name", SchemaDocument::string()),
        ("tags", SchemaDocument::array(SchemaDocument::string())),
        (
            "meta",
            SchemaDocument::object([
                ("created", SchemaDocument::date()),
                ("score", SchemaDocument::number()),
                ("deleted", SchemaDocument::null()),
                ("archived", SchemaDocument::boolean()),
            ]),
        ),
    ])
}

fn record() -> Value {
    object(vec![
        ("name", Value::from("loom")),
        ("tags", Value::from(vec!["cli", "yes", "42"])),
        (
            "meta",
            object(vec![
                ("created", date(2024, 2, 29)),
                ("score", Value::from(0.1 + 0.2)),
                ("deleted", Value::Null),
                ("archived", Value::from(false)),
            ]),
        ),
    ])
}

fn grid_schema() -> SchemaDocument {
    SchemaDocument::array(SchemaDocument::object([(
        "rows",
        SchemaDocument::array(SchemaDocument::array(SchemaDocument::number())),
    )]))
}

fn grid() -> Value {
    Value::from(vec![object(vec![(
        "rows",
        Value::from(vec![
            Value::from(vec![1.0, -2.5]),
            Value::from(Vec::<Value>::new()),
            Value::from(vec![1e-300, 12345.678]),
        ]),
    )])])
}

fn optional_schema() -> SchemaDocument {
    SchemaDocument::object([
        ("id", SchemaDocument::number()),
        ("nickname", SchemaDocument::void()),
    ])
}

fn optional() -> Value {
    object(vec![("id", Value::from(7)), ("nickname", Value::Void)])
}

#[rstest]
#[case::integer(SchemaDocument::number(), Value::from(5))]
#[case::fraction(SchemaDocument::number(), Value::from(0.1))]
#[case::negative_zero(SchemaDocument::number(), Value::from(-0.0))]
#[case::unicode(SchemaDocument::string(), Value::from("he said \"hi\" ✓\nnext line"))]
#[case::numeric_looking(SchemaDocument::string(), Value::from("true"))]
#[case::boolean(SchemaDocument::boolean(), Value::from(true))]
#[case::null(SchemaDocument::null(), Value::Null)]
#[case::date(SchemaDocument::date(), date(1999, 12, 31))]
#[case::empty_array(SchemaDocument::array(SchemaDocument::number()), Value::from(Vec::<Value>::new()))]
#[case::record(record_schema(), record())]
#[case::depth_four(grid_schema(), grid())]
#[case::absent_field(optional_schema(), optional())]
#[tokio::test]
async fn structured_families_round_trip(
    #[values("json", "yaml")] family: &str,
    #[case] schema: SchemaDocument,
    #[case] value: Value,
) {
    let codec = CodecRegistry::default().codec(family, schema.clone()).unwrap();
    let raw = codec.encode(&value).unwrap();

    let out = MemoryWriter::new();
    let dispatcher = single_task(
        "echo",
        identity()
            .input(InputBinding::new(family, schema.clone(), MemoryReader::new(raw.clone())))
            .output(OutputBinding::new(family, schema, out.clone())),
    );
    dispatcher.invoke("echo", Params::new()).await.unwrap();

    assert_eq!(out.contents(), raw);
    assert_eq!(codec.decode(&out.contents()).unwrap(), value);
}

#[rstest]
#[case("")]
#[case("plain")]
#[case("  padded with spaces  \n\n")]
#[case("{\"not\": \"parsed\"}")]
#[tokio::test]
async fn text_family_is_verbatim(#[case] raw: &str) {
    let out = MemoryWriter::new();
    let dispatcher = single_task(
        "cat",
        identity()
            .input(InputBinding::text(MemoryReader::new(raw)))
            .output(OutputBinding::text(out.clone())),
    );
    dispatcher.invoke("cat", Params::new()).await.unwrap();
    assert_eq!(out.contents(), raw);
}

#[rstest]
#[case::empty("")]
#[case::whitespace(" \n\t")]
#[case::multiline("first\nsecond\n")]
fn text_family_round_trips_strings(#[case] text: &str) {
    let codec = CodecRegistry::default()
        .codec("text", SchemaDocument::string())
        .unwrap();
    let value = Value::from(text);

    let raw = codec.encode(&value).unwrap();

    assert_eq!(raw, text);
    assert_eq!(codec.decode(&raw).unwrap(), value);
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn add_from_the_command_line() {
    let out = MemoryWriter::new();
    let spec = TaskSpec::from_fn(|params: Params, _, _| async move {
        Ok::<_, TaskError>(TaskOutput::single(params.number("a")? + params.number("b")?))
    })
    .param(ParameterSpec::number("a"))
    .param(ParameterSpec::number("b"))
    .output(OutputBinding::json(SchemaDocument::number(), out.clone()));
    let dispatcher = single_task("add", spec);

    let outcome = dispatcher.run(["loom", "add", "2", "3"]).await.unwrap();

    let RunOutcome::Completed(report) = outcome else {
        panic!("expected a completed dispatch, got {outcome:?}");
    };
    assert_eq!(report.task, "add");
    assert_eq!(report.state, DispatchState::Done);
    assert_eq!(out.contents(), "5\n");
}

#[tokio::test]
async fn echo_a_json_string() {
    let out = MemoryWriter::new();
    let dispatcher = single_task(
        "echo",
        identity()
            .input(InputBinding::json(SchemaDocument::string(), MemoryReader::new("\"hello\"")))
            .output(OutputBinding::json(SchemaDocument::string(), out.clone())),
    );

    dispatcher.run(["loom", "echo"]).await.unwrap();
    assert_eq!(out.contents(), "\"hello\"\n");
}

#[tokio::test]
async fn unknown_task_writes_nothing() {
    let out = MemoryWriter::new();
    let reader = MemoryReader::new("\"hello\"");
    let dispatcher = single_task(
        "echo",
        identity()
            .input(InputBinding::json(SchemaDocument::string(), reader.clone()))
            .output(OutputBinding::json(SchemaDocument::string(), out.clone())),
    );

    let err = dispatcher.invoke("ehco", Params::new()).await.unwrap_err();

    assert!(matches!(err, LoomError::UnknownTask(ref name) if name == "ehco"));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(reader.reads(), 0);
    assert!(out.writes().is_empty());
}

#[tokio::test]
async fn interactive_input_is_not_read() {
    let out = MemoryWriter::new();
    let reader = MemoryReader::interactive();
    let spec = TaskSpec::from_fn(|_, input: Value, _| async move {
        Ok(TaskOutput::single(input.is_void()))
    })
    .input(InputBinding::json(SchemaDocument::string(), reader.clone()))
    .output(OutputBinding::json(SchemaDocument::boolean(), out.clone()));
    let dispatcher = single_task("peek", spec);

    dispatcher.invoke("peek", Params::new()).await.unwrap();

    assert_eq!(reader.reads(), 0);
    assert_eq!(out.contents(), "true\n");
}

#[tokio::test]
async fn validation_failure_names_the_path_and_skips_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let out = MemoryWriter::new();
    let spec = TaskSpec::from_fn(move |_, input: Value, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(TaskOutput::single(input)) }
    })
    .input(InputBinding::json(
        record_schema(),
        MemoryReader::new(
            r#"{"name": "x", "tags": [], "meta": {"created": "2024-01-01", "score": "high", "deleted": null, "archived": true}}"#,
        ),
    ))
    .output(OutputBinding::json(record_schema(), out.clone()));
    let dispatcher = single_task("ingest", spec);

    let err = dispatcher.invoke("ingest", Params::new()).await.unwrap_err();

    let LoomError::Validation { task, source } = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(task, "ingest");
    assert_eq!(source.path.to_string(), "$.meta.score");
    assert_eq!(source.found, ValueKind::String);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(out.writes().is_empty());
}

#[tokio::test]
async fn malformed_input_is_a_decode_error() {
    let dispatcher = single_task(
        "echo",
        identity()
            .input(InputBinding::yaml(SchemaDocument::string(), MemoryReader::new("key: [unclosed")))
            .output(OutputBinding::json(SchemaDocument::string(), MemoryWriter::new())),
    );
    let err = dispatcher.invoke("echo", Params::new()).await.unwrap_err();
    assert!(matches!(err, LoomError::Decode { .. }));
    assert_eq!(err.exit_code(), 1);
}

// =============================================================================
// Output sequencing
// =============================================================================

#[derive(Clone)]
struct TracingWriter {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Writer for TracingWriter {
    async fn write(&self, raw: &str) -> Result<(), ChannelError> {
        self.log.lock().unwrap().push(format!("start {}", self.name));
        tokio::task::yield_now().await;
        self.log
            .lock()
            .unwrap()
            .push(format!("end {} {}", self.name, raw.trim_end()));
        Ok(())
    }

    fn describe(&self) -> String {
        format!("tracing:{}", self.name)
    }
}

#[tokio::test]
async fn outputs_are_written_one_at_a_time_in_declaration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let writer = |name| TracingWriter {
        name,
        log: log.clone(),
    };
    let spec = TaskSpec::from_fn(|_, _, _| async {
        Ok(TaskOutput::none()
            .with("second", 2)
            .with("first", 1)
            .with("undeclared", 3))
    })
    .named_output("first", OutputBinding::json(SchemaDocument::number(), writer("first")))
    .named_output("skipped", OutputBinding::json(SchemaDocument::number(), writer("skipped")))
    .named_output("second", OutputBinding::json(SchemaDocument::number(), writer("second")));
    let dispatcher = single_task("fanout", spec);

    let report = dispatcher.invoke("fanout", Params::new()).await.unwrap();

    assert_eq!(report.written, vec!["first", "second"]);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["start first", "end first 1", "start second", "end second 2"]
    );
}

#[tokio::test]
async fn encode_failure_stops_after_earlier_outputs() {
    let first = MemoryWriter::new();
    let second = MemoryWriter::new();
    let spec = TaskSpec::from_fn(|_, _, _| async {
        Ok(TaskOutput::none().with("count", 1).with("label", 2))
    })
    .named_output("count", OutputBinding::json(SchemaDocument::number(), first.clone()))
    .named_output("label", OutputBinding::json(SchemaDocument::string(), second.clone()));
    let dispatcher = single_task("mislabel", spec);

    let err = dispatcher.invoke("mislabel", Params::new()).await.unwrap_err();

    assert!(matches!(err, LoomError::Encode { ref binding, .. } if binding == "label"));
    assert_eq!(first.contents(), "1\n");
    assert!(second.writes().is_empty());
}

// =============================================================================
// Channels and effects
// =============================================================================

#[tokio::test]
async fn file_channels_convert_json_to_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.json");
    let output = dir.path().join("out").join("result.yaml");
    std::fs::write(&input, r#"{"name": "loom", "count": 3}"#).unwrap();

    let schema = SchemaDocument::object([
        ("name", SchemaDocument::string()),
        ("count", SchemaDocument::number()),
    ]);
    let dispatcher = single_task(
        "convert",
        identity()
            .input(InputBinding::json(schema.clone(), FileReader::new(&input)))
            .output(OutputBinding::yaml(schema, FileWriter::new(&output))),
    );

    dispatcher.invoke("convert", Params::new()).await.unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("name: loom"));
    assert!(written.contains("count: 3"));
}

#[tokio::test]
async fn missing_input_file_is_a_channel_error() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = single_task(
        "convert",
        identity()
            .input(InputBinding::json(SchemaDocument::string(), FileReader::new(dir.path().join("absent.json"))))
            .output(OutputBinding::json(SchemaDocument::string(), MemoryWriter::new())),
    );
    let err = dispatcher.invoke("convert", Params::new()).await.unwrap_err();
    assert!(matches!(err, LoomError::Channel { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn shell_failure_reaches_the_dispatch_boundary() {
    let out = MemoryWriter::new();
    let spec = TaskSpec::from_fn(|_, _, effect: Arc<Effect>| async move {
        let stdout = effect.execute("echo partial; echo boom >&2; exit 2").await?;
        Ok::<_, TaskError>(TaskOutput::single(stdout))
    })
    .output(OutputBinding::text(out.clone()));
    let dispatcher = single_task("deploy", spec);

    let err = dispatcher.invoke("deploy", Params::new()).await.unwrap_err();

    let LoomError::Shell { task, source } = err else {
        panic!("expected a shell error, got {err:?}");
    };
    assert_eq!(task, "deploy");
    assert_eq!(source.code(), Some(2));
    assert_eq!(source.stderr(), "boom");
    assert!(out.writes().is_empty());
}

#[tokio::test]
async fn effect_is_shared_across_invocations() {
    let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
    let record = seen.clone();
    let spec = TaskSpec::from_fn(move |_, _, effect: Arc<Effect>| {
        record.lock().unwrap().push(Arc::as_ptr(&effect) as usize);
        async { Ok(TaskOutput::none()) }
    });
    let dispatcher = single_task("twice", spec);

    dispatcher.invoke("twice", Params::new()).await.unwrap();
    dispatcher.invoke("twice", Params::new()).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
}

#[tokio::test]
async fn later_registration_is_dispatched() {
    let out = MemoryWriter::new();
    let constant = |text: &'static str| {
        TaskSpec::from_fn(move |_, _, _| async move { Ok(TaskOutput::single(text)) })
            .output(OutputBinding::text(out.clone()))
    };
    let app = AppBuilder::new("loom")
        .task("foo", constant("first"))
        .task("foo", constant("second"))
        .build()
        .unwrap();

    Dispatcher::new(app)
        .invoke("foo", Params::new())
        .await
        .unwrap();
    assert_eq!(out.contents(), "second");
}

#[test]
fn root_path_displays_as_dollar() {
    assert_eq!(SchemaPath::root().to_string(), "$");
}
