//! Debounce and surface-replacement behaviour of `PreviewSession`

use rfpreview::{Error, PreviewFrame, PreviewSession, SessionConfig, SourceBundle, SourceKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Frames = Arc<Mutex<Vec<PreviewFrame>>>;

fn recording(debounce_ms: u64) -> (PreviewSession, Frames) {
    let frames: Frames = Arc::new(Mutex::new(Vec::new()));
    let sink = frames.clone();
    let config = SessionConfig {
        debounce_ms,
        ..Default::default()
    };
    let session = PreviewSession::new(config, move |frame| {
        sink.lock().unwrap().push(frame.clone());
    })
    .expect("session");
    (session, frames)
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn five_rapid_edits_compose_once_with_last_value() {
    let (mut session, frames) = recording(250);
    for i in 0..5 {
        session.edit(SourceKind::Html, format!("<p>edit {}</p>", i)).unwrap();
        sleep_ms(50).await;
    }
    assert!(frames.lock().unwrap().is_empty());

    sleep_ms(300).await;
    let frames = frames.lock().unwrap();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].document.as_str().contains("<p>edit 4</p>"));
    assert!(!frames[0].document.as_str().contains("<p>edit 3</p>"));
}

#[tokio::test(start_paused = true)]
async fn edits_to_different_fields_accumulate_into_one_snapshot() {
    let (mut session, frames) = recording(250);
    session.edit(SourceKind::Html, "<h1>T</h1>").unwrap();
    session.edit(SourceKind::Css, "h1 { color: teal; }").unwrap();
    session.edit(SourceKind::Js, "console.log('x');").unwrap();
    sleep_ms(300).await;

    let frames = frames.lock().unwrap();
    assert_eq!(frames.len(), 1);
    let expected = rfpreview::render(&SourceBundle::new("<h1>T</h1>", "h1 { color: teal; }", "console.log('x');"));
    assert_eq!(frames[0].document, expected);
}

#[tokio::test(start_paused = true)]
async fn render_keys_increase_between_renders() {
    let (mut session, frames) = recording(100);
    session.update(SourceBundle::new("<p>one</p>", "", "")).unwrap();
    sleep_ms(150).await;
    session.update(SourceBundle::new("<p>two</p>", "", "")).unwrap();
    sleep_ms(150).await;

    let frames = frames.lock().unwrap();
    let keys: Vec<u64> = frames.iter().map(|f| f.key).collect();
    assert_eq!(keys, vec![1, 2]);
    assert_ne!(frames[0].document, frames[1].document);
    assert_eq!(session.current().map(|f| f.key), Some(2));
}

#[tokio::test(start_paused = true)]
async fn same_content_still_gets_a_fresh_key() {
    let (mut session, frames) = recording(100);
    let bundle = SourceBundle::starter();
    session.update(bundle.clone()).unwrap();
    sleep_ms(150).await;
    session.update(bundle).unwrap();
    sleep_ms(150).await;

    let frames = frames.lock().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].document, frames[1].document);
    assert!(frames[1].key > frames[0].key);
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_pending_render() {
    let (mut session, frames) = recording(250);
    session.edit(SourceKind::Html, "<p>never shown</p>").unwrap();
    sleep_ms(100).await;
    session.dispose();
    sleep_ms(1000).await;

    assert!(frames.lock().unwrap().is_empty());
    assert!(session.is_disposed());
    assert!(session.current().is_none());
    assert!(matches!(session.update(SourceBundle::default()), Err(Error::SessionDisposed)));
    assert!(matches!(session.edit(SourceKind::Css, "x"), Err(Error::SessionDisposed)));
    assert!(matches!(session.flush(), Err(Error::SessionDisposed)));
}

#[tokio::test(start_paused = true)]
async fn dropping_session_cancels_pending_render() {
    let (mut session, frames) = recording(250);
    session.edit(SourceKind::Html, "<p>x</p>").unwrap();
    drop(session);
    sleep_ms(1000).await;
    assert!(frames.lock().unwrap().is_empty());
}

#[cfg(feature = "probe")]
#[tokio::test(start_paused = true)]
async fn replaced_surface_drops_previous_timers() {
    use rfpreview::{PreviewProbe, ProbeConfig};

    let (mut session, frames) = recording(100);
    session
        .update(SourceBundle::new(
            "<div id=\"a\">A</div>",
            "",
            "setTimeout(function () { document.getElementById('a').scrollIntoView(); }, 1000);",
        ))
        .unwrap();
    sleep_ms(150).await;
    session.update(SourceBundle::new("<div id=\"b\">B</div>", "", "")).unwrap();
    sleep_ms(150).await;

    let frames = frames.lock().unwrap().clone();
    assert_eq!(frames.len(), 2);
    assert!(frames[1].key > frames[0].key);

    // the first surface on its own would fire its timer
    let mut first = PreviewProbe::load(&frames[0].document, ProbeConfig::default()).unwrap();
    first.advance(1000).unwrap();
    assert_eq!(first.scrolls().unwrap().len(), 1);

    // after replacement only the new document's context exists
    let mut second = PreviewProbe::load(&frames[1].document, ProbeConfig::default()).unwrap();
    second.advance(5000).unwrap();
    let report = second.report().unwrap();
    assert!(report.scrolls.is_empty());
    assert_eq!(report.pending_timers, 0);
}
