pub mod action;
pub mod state;
pub mod view;

use crate::client::{FetchError, PostClient, PostSource};
use crate::config::Config;
use crate::feed::PageRequest;
use crate::logging;
use crate::model::{Filter, Post};
use crate::storage::{FileBackend, Store};
use action::{Action, AppEvent};
use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use state::{AppState, InputMode, Tab};
use std::{io, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn run() -> Result<()> {
    let config = Config::load()?;
    let data_dir = config.resolve_data_dir()?;
    let log_path = logging::init(&config.log_level, &data_dir)?;
    logging::install_panic_hook(log_path);
    info!(data_dir = %data_dir.display(), posts_url = %config.posts_url, "starting");
    if Config::get_path().is_some_and(|p| !p.exists())
        && let Err(e) = config.save()
    {
        warn!(error = %e, "could not write default config");
    }

    let store = Store::new(FileBackend::new(&data_dir));
    let client = PostClient::new(&config.posts_url, config.request_timeout())
        .context("configure posts client")?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (action_tx, action_rx) = mpsc::channel(10);
    let (event_tx, event_rx) = mpsc::channel(10);

    // SPAWN ACTOR
    tokio::spawn(fetch_actor(client, action_rx, event_tx));

    let mut app_state = AppState::new(store);
    let result = ui_loop(&mut terminal, &mut app_state, action_tx, event_rx).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Serves page requests one at a time. Exits when the UI hangs up; a page
/// that arrives after that is dropped.
async fn fetch_actor<S: PostSource>(
    source: S,
    mut action_rx: mpsc::Receiver<Action>,
    event_tx: mpsc::Sender<AppEvent>,
) {
    while let Some(action) = action_rx.recv().await {
        match action {
            Action::Quit => break,
            Action::FetchPage(request) => {
                let result = source.fetch_page(request.page, request.limit).await;
                if event_tx
                    .send(AppEvent::PageLoaded(request, result))
                    .await
                    .is_err()
                {
                    debug!(page = request.page, "ui closed, dropping page");
                    break;
                }
            }
        }
    }
}

async fn ui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app_state: &mut AppState,
    action_tx: mpsc::Sender<Action>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    if let Some(request) = app_state.feed.activate() {
        dispatch(app_state, &action_tx, Action::FetchPage(request)).await;
    }

    loop {
        terminal.draw(|f| view::draw(f, app_state))?;

        // 1. Apply network results
        while let Ok(event) = event_rx.try_recv() {
            match event {
                AppEvent::PageLoaded(request, result) => apply_page(app_state, request, result),
            }
        }

        // 2. Viewport signal
        if let Some(request) = app_state.poll_sentinel() {
            dispatch(app_state, &action_tx, Action::FetchPage(request)).await;
        }

        // 3. Process User Input
        if crossterm::event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Mouse(mouse_event) => match mouse_event.kind {
                    MouseEventKind::ScrollDown => app_state.next(),
                    MouseEventKind::ScrollUp => app_state.previous(),
                    _ => {}
                },
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(action) = handle_key(app_state, key) {
                        let quit = matches!(action, Action::Quit);
                        dispatch(app_state, &action_tx, action).await;
                        if quit {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn apply_page(
    app_state: &mut AppState,
    request: PageRequest,
    result: Result<Vec<Post>, FetchError>,
) {
    app_state.feed.apply(request, result);
    app_state.message = match app_state.feed.error() {
        Some(e) => format!("Error: {e}"),
        None => format!("Posts: {}", app_state.feed.posts().len()),
    };
}

/// Hands an action to the fetch actor. A page request the actor can no
/// longer take fails the feed, so the error panel and retry stay reachable.
async fn dispatch(app_state: &mut AppState, action_tx: &mpsc::Sender<Action>, action: Action) {
    match action_tx.send(action).await {
        Ok(()) => {}
        Err(mpsc::error::SendError(Action::FetchPage(request))) => {
            warn!(page = request.page, "fetch actor is gone");
            apply_page(app_state, request, Err(FetchError::Stopped));
        }
        Err(mpsc::error::SendError(Action::Quit)) => {
            debug!("fetch actor already stopped");
        }
    }
}

/// Applies a key press to the state; returns work for the fetch actor.
fn handle_key(app_state: &mut AppState, key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    if app_state.mode != InputMode::Normal {
        match key.code {
            KeyCode::Enter => app_state.submit_input(),
            KeyCode::Esc => app_state.cancel_input(),
            KeyCode::Char(c) => app_state.enter_char(c),
            KeyCode::Backspace => app_state.delete_char(),
            KeyCode::Left => app_state.move_cursor_left(),
            KeyCode::Right => app_state.move_cursor_right(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') => return Some(Action::Quit),
        KeyCode::Tab => app_state.toggle_tab(),
        KeyCode::Char('t') => {
            let theme = app_state.theme.toggle();
            app_state.message = format!("Theme: {theme:?}");
        }
        // Navigation
        KeyCode::Down | KeyCode::Char('j') => app_state.next(),
        KeyCode::Up | KeyCode::Char('k') => app_state.previous(),
        KeyCode::PageDown => app_state.jump_forward(10),
        KeyCode::PageUp => app_state.jump_backward(10),
        _ => {
            return match app_state.tab {
                Tab::Tasks => handle_task_key(app_state, key.code),
                Tab::Posts => handle_post_key(app_state, key.code),
            };
        }
    }
    None
}

fn handle_task_key(app_state: &mut AppState, code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('a') => {
            app_state.start_creating();
            app_state.message = "Type a task and press Enter".to_string();
        }
        KeyCode::Char(' ') | KeyCode::Enter => app_state.toggle_selected(),
        KeyCode::Char('d') | KeyCode::Delete => app_state.delete_selected(),
        KeyCode::Char('1') => app_state.set_filter(Filter::All),
        KeyCode::Char('2') => app_state.set_filter(Filter::Active),
        KeyCode::Char('3') => app_state.set_filter(Filter::Completed),
        _ => {}
    }
    None
}

fn handle_post_key(app_state: &mut AppState, code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('/') => {
            app_state.start_searching();
            None
        }
        KeyCode::Char('r') => app_state.feed.retry().map(Action::FetchPage),
        KeyCode::Char('R') => {
            app_state.post_state.select(Some(0));
            Some(Action::FetchPage(app_state.feed.reload()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    struct OnePage;

    impl PostSource for OnePage {
        async fn fetch_page(&self, page: u32, _limit: u32) -> Result<Vec<Post>, FetchError> {
            Ok(vec![Post {
                id: page as u64,
                title: "t".into(),
                body: "b".into(),
            }])
        }
    }

    #[test]
    fn test_keys_drive_the_task_list() {
        let mut app = AppState::new(Store::in_memory());
        handle_key(&mut app, press(KeyCode::Char('a')));
        for c in "walk".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(app.tasks.tasks().len(), 1);

        handle_key(&mut app, press(KeyCode::Char(' ')));
        assert!(app.tasks.tasks()[0].completed);

        handle_key(&mut app, press(KeyCode::Char('2')));
        assert_eq!(app.tasks.filter(), Filter::Active);

        handle_key(&mut app, press(KeyCode::Char('1')));
        handle_key(&mut app, press(KeyCode::Char('d')));
        assert!(app.tasks.tasks().is_empty());
    }

    #[test]
    fn test_q_inside_input_is_text() {
        let mut app = AppState::new(Store::in_memory());
        handle_key(&mut app, press(KeyCode::Char('a')));
        assert!(handle_key(&mut app, press(KeyCode::Char('q'))).is_none());
        assert_eq!(app.input_buffer, "q");
        assert!(matches!(
            handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        ));
    }

    #[test]
    fn test_retry_key_only_after_error() {
        let mut app = AppState::new(Store::in_memory());
        app.toggle_tab();
        assert!(handle_key(&mut app, press(KeyCode::Char('r'))).is_none());

        let request = app.feed.activate().unwrap();
        app.feed
            .apply(request, Err(FetchError::Body("reset".into())));
        match handle_key(&mut app, press(KeyCode::Char('r'))) {
            Some(Action::FetchPage(again)) => assert_eq!(again, request),
            other => panic!("expected a fetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_actor_answers_requests_in_order() {
        let (action_tx, action_rx) = mpsc::channel(10);
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let actor = tokio::spawn(fetch_actor(OnePage, action_rx, event_tx));

        let mut feed = crate::feed::Feed::new();
        let first = feed.activate().unwrap();
        action_tx.send(Action::FetchPage(first)).await.unwrap();
        let AppEvent::PageLoaded(req, result) = event_rx.recv().await.unwrap();
        assert_eq!(req, first);
        assert!(feed.apply(req, result));
        assert_eq!(feed.posts().len(), 1);

        action_tx.send(Action::Quit).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_to_stopped_actor_fails_the_feed() {
        let mut app = AppState::new(Store::in_memory());
        let (action_tx, action_rx) = mpsc::channel(10);
        drop(action_rx);

        let request = app.feed.activate().unwrap();
        dispatch(&mut app, &action_tx, Action::FetchPage(request)).await;
        assert!(!app.feed.is_loading());
        assert_eq!(app.feed.error(), Some("background fetcher has stopped"));
        assert!(app.message.starts_with("Error:"));
        assert_eq!(app.feed.retry(), Some(request));

        // Quit on a closed channel is not an error
        dispatch(&mut app, &action_tx, Action::Quit).await;
    }

    #[tokio::test]
    async fn test_fetch_actor_stops_when_ui_is_gone() {
        let (action_tx, action_rx) = mpsc::channel(10);
        let (event_tx, event_rx) = mpsc::channel(10);
        drop(event_rx);
        let actor = tokio::spawn(fetch_actor(OnePage, action_rx, event_tx));
        let request = crate::feed::PageRequest { page: 1, limit: 10 };
        action_tx.send(Action::FetchPage(request)).await.unwrap();
        actor.await.unwrap();
    }
}
