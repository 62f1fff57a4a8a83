mod platform;

use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use client_logging::{client_info, client_warn};
use delver_client::ApiSettings;
use delver_core::{AppViewModel, Msg, SessionStatus, RESULT_LOAD_ERROR};

use platform::logging::{self, LogDestination};
use platform::AppShell;

fn main() -> anyhow::Result<()> {
    logging::initialize(LogDestination::Terminal);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (topic, depth) = parse_args(&args)?;

    let settings = ApiSettings::from_env();
    client_info!("using research API at {}", settings.base_url);

    let mut shell = AppShell::new(settings)?;
    shell
        .health_check()
        .context("research server unreachable")?;

    show_topic_history(&mut shell);
    run_session(&mut shell, topic, depth)?;
    show_result_listing(&mut shell);

    shell.dispatch(Msg::SessionDismissed);
    Ok(())
}

fn parse_args(args: &[String]) -> anyhow::Result<(String, u8)> {
    match args {
        [topic] => Ok((topic.clone(), 2)),
        [topic, depth] => {
            let depth = depth.parse().context("depth must be an integer")?;
            Ok((topic.clone(), depth))
        }
        _ => bail!("usage: delver_app <topic> [depth]"),
    }
}

fn show_topic_history(shell: &mut AppShell) {
    shell.dispatch(Msg::TopicsRequested);
    if !pump_until(shell, Duration::from_secs(5), |view| !view.loading) {
        client_warn!("topic history did not arrive in time");
        return;
    }

    let view = shell.view();
    if let Some(error) = &view.error {
        client_warn!("{error}");
    } else if view.topics.is_empty() {
        client_info!("no previously researched topics");
    } else {
        client_info!("previously researched topics:");
        for topic in &view.topics {
            client_info!("  - {topic}");
        }
    }
}

fn run_session(shell: &mut AppShell, topic: String, depth: u8) -> anyhow::Result<()> {
    shell.dispatch(Msg::StartSubmitted { topic, depth });

    // Poll until the tracked session reaches a terminal state. Matching the
    // server contract, there is no upper bound on how long that may take.
    let completed_id = loop {
        shell.pump(Duration::from_millis(250));
        let view = shell.view();

        if view.session.is_none() && !view.loading {
            if let Some(error) = &view.error {
                bail!("{error}");
            }
        }
        if shell.consume_dirty() {
            if let Some(session) = &view.session {
                client_info!(
                    "session {} is {:?} at {}%",
                    session.id,
                    session.status,
                    session.progress
                );
            }
        }

        let Some(session) = view.session else {
            continue;
        };
        match session.status {
            SessionStatus::Completed => break session.id,
            SessionStatus::Failed => {
                let detail = session
                    .error
                    .unwrap_or_else(|| "no error detail".to_string());
                bail!("research failed: {detail}");
            }
            SessionStatus::Pending | SessionStatus::InProgress => {}
        }
    };

    fetch_and_print_result(shell, completed_id)
}

fn fetch_and_print_result(shell: &mut AppShell, result_id: String) -> anyhow::Result<()> {
    shell.dispatch(Msg::ResultRequested { result_id });

    // A little longer than the transport timeout so a slow fetch can still
    // classify before we give up.
    let deadline = Instant::now() + Duration::from_secs(35);
    let result = loop {
        if Instant::now() >= deadline {
            bail!("timed out waiting for the research result");
        }
        shell.pump(Duration::from_millis(100));
        if let Some(result) = shell.take_result() {
            break result;
        }
        if shell.view().error.as_deref() == Some(RESULT_LOAD_ERROR) {
            bail!("{RESULT_LOAD_ERROR}");
        }
    };

    client_info!(
        "research on '{}' completed at {}",
        result.topic,
        result.completed_time
    );
    client_info!("summary: {}", result.summary);
    for section in &result.sections {
        client_info!("# {}", section.title);
        client_info!("{}", section.content);
        for source in &section.sources {
            client_info!("  source: {} <{}>", source.title, source.url);
        }
    }
    if !result.references.is_empty() {
        client_info!("references:");
        for reference in &result.references {
            match &reference.description {
                Some(description) => {
                    client_info!("  - {} <{}> {}", reference.title, reference.url, description)
                }
                None => client_info!("  - {} <{}>", reference.title, reference.url),
            }
        }
    }
    Ok(())
}

fn show_result_listing(shell: &mut AppShell) {
    shell.dispatch(Msg::ResultsRequested);
    if !pump_until(shell, Duration::from_secs(5), |view| !view.loading) {
        client_warn!("result listing did not arrive in time");
        return;
    }

    let view = shell.view();
    client_info!(
        "{} completed research result(s) on the server",
        view.results.len()
    );
    for row in &view.results {
        client_info!("  {} [{}] {}", row.completed_time, row.id, row.topic);
    }
}

fn pump_until(
    shell: &mut AppShell,
    deadline: Duration,
    done: impl Fn(&AppViewModel) -> bool,
) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        shell.pump(Duration::from_millis(100));
        if done(&shell.view()) {
            return true;
        }
    }
    false
}
