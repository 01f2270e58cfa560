use std::process::ExitCode;

use loom_core::{App, AppBuilder, BuildError, Dispatcher, LoomConfig, telemetry};

mod tasks;

fn build_app() -> Result<App, BuildError> {
    AppBuilder::new("loom")
        .about("Run schema-typed tasks from the command line")
        .version(env!("CARGO_PKG_VERSION"))
        .task("add", tasks::add())
        .task("echo", tasks::echo())
        .task("greet", tasks::greet())
        .task("lines", tasks::lines())
        .task("sh", tasks::sh())
        .task("stats", tasks::stats())
        .build()
}

#[tokio::main]
async fn main() -> ExitCode {
    // (A) 設定を読んで tracing を初期化（ログは stderr）
    let (config, warnings) = LoomConfig::from_env();
    if let Err(err) = telemetry::initialise(&config) {
        eprintln!("loom: {err}");
        return ExitCode::FAILURE;
    }
    for warning in warnings {
        tracing::warn!("{warning}");
    }

    // (B) タスクを登録して検証
    let app = match build_app() {
        Ok(app) => app,
        Err(err) => {
            tracing::error!(error = %err, "invalid task declarations");
            eprintln!("loom: {err}");
            return ExitCode::FAILURE;
        }
    };

    // (C) argv のタスクを 1 つ実行
    Dispatcher::with_config(app, config)
        .run_to_exit(std::env::args_os())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_tasks_are_valid() {
        let app = build_app().unwrap();
        assert_eq!(
            app.tasks().names(),
            vec!["add", "echo", "greet", "lines", "sh", "stats"]
        );
    }
}
