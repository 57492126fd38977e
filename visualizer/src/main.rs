use civiccore::favorites::{JsonFileBackend, ReconcileOutcome};
use civiccore::feed_interface::{Feed, Record, StatusLevel};
use civiccore::lifecycle::AppContext;
use civiccore::prelude::RemoteDataSource;
use civiccore::refresh::CycleOutcome;
use clap::Parser;
use iced::{
    event, mouse, time,
    widget::{
        button,
        canvas::{self, Canvas, Frame, Geometry, Path, Stroke},
        column, row, scrollable, text, Column, Container, Row,
    },
    window, Alignment, Color, Element, Event, Length, Point, Rectangle, Renderer, Subscription,
    Task, Theme,
};
use log::{info, warn};
use screen::FeedScreen;
use source::HttpFeedSource;
use std::{path::PathBuf, sync::Arc, time::Duration};

mod screen;
mod source;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Civic operations feed viewer")]
struct Args {
    /// Base URL of the feed API
    #[arg(long, default_value = "http://127.0.0.1:9000")]
    endpoint: String,
    /// Where starred records are kept between sessions
    #[arg(long, default_value = "civic_favorites.json")]
    favorites: PathBuf,
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// Automatic refresh period for the visible feed
    #[arg(long, default_value_t = 30)]
    refresh_secs: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let source: Arc<dyn RemoteDataSource> = Arc::new(HttpFeedSource::new(
        &args.endpoint,
        Duration::from_secs(args.timeout_secs),
    )?);
    info!("viewer using feed API at {}", args.endpoint);

    iced::application(
        move || Visualizer::boot(&args, source.clone()),
        Visualizer::update,
        Visualizer::view,
    )
    .title(application_title)
    .subscription(application_subscription)
    .theme(application_theme)
    .window(window::Settings {
        exit_on_close_request: false,
        ..Default::default()
    })
    .run()?;
    Ok(())
}

fn application_title(state: &Visualizer) -> String {
    format!("Civic Feeds - {}", state.selected.title())
}

fn application_subscription(state: &Visualizer) -> Subscription<Message> {
    Subscription::batch([
        time::every(state.refresh_every).map(|_| Message::Tick),
        event::listen_with(window_event),
    ])
}

fn window_event(event: Event, _status: event::Status, _id: window::Id) -> Option<Message> {
    match event {
        Event::Window(window::Event::Unfocused) => Some(Message::Background),
        Event::Window(window::Event::Focused) => Some(Message::Foreground),
        Event::Window(window::Event::CloseRequested) => Some(Message::CloseRequested),
        _ => None,
    }
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

struct Visualizer {
    app: AppContext,
    screens: Vec<FeedScreen>,
    selected: Feed,
    refresh_every: Duration,
    backgrounded: bool,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    SelectFeed(Feed),
    Retry,
    CycleFinished(Feed, CycleOutcome),
    ToggleFavorite(Feed, String),
    Background,
    Foreground,
    CloseRequested,
}

impl Visualizer {
    fn boot(args: &Args, source: Arc<dyn RemoteDataSource>) -> (Self, Task<Message>) {
        let app = AppContext::launch(JsonFileBackend::new(&args.favorites));
        let mut state = Self::new(
            app,
            source,
            Duration::from_secs(args.refresh_secs.max(1)),
        );
        let task = state.start_selected();
        (state, task)
    }

    fn new(app: AppContext, source: Arc<dyn RemoteDataSource>, refresh_every: Duration) -> Self {
        let screens = Feed::ALL
            .iter()
            .map(|feed| FeedScreen::new(&app, *feed, source.clone()))
            .collect();
        Visualizer {
            app,
            screens,
            selected: Feed::Alerts,
            refresh_every,
            backgrounded: false,
            status: "Waiting for feeds...".into(),
            history: Vec::new(),
        }
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                if state.backgrounded || state.screen(state.selected).controller().is_loading() {
                    Task::none()
                } else {
                    state.start_selected()
                }
            }
            Message::SelectFeed(feed) if feed == state.selected => Task::none(),
            Message::SelectFeed(feed) => {
                state.screen_mut(state.selected).disappear();
                state.selected = feed;
                state.start_selected()
            }
            Message::Retry => state.start_selected(),
            Message::CycleFinished(feed, outcome) => {
                let screen = state.screen_mut(feed);
                if !screen.controller_mut().complete(outcome) {
                    return Task::none();
                }
                let line = screen.status_line();
                let changes = screen.controller().status_changes().to_vec();
                for change in changes {
                    state.push_history(format!(
                        "* {} ({}): {} -> {}",
                        change.name, change.feed, change.from, change.to
                    ));
                }
                state.status = line.clone();
                state.push_history(line);
                Task::none()
            }
            Message::ToggleFavorite(feed, identity) => {
                let starred = state.app.favorites().toggle_favorite(feed.id(), &identity);
                state.push_history(format!(
                    "{} {} in {}",
                    if starred { "Starred" } else { "Unstarred" },
                    identity,
                    feed.title()
                ));
                Task::none()
            }
            Message::Background => {
                state.backgrounded = true;
                state.screen_mut(state.selected).disappear();
                if !state.app.enter_background() {
                    state.status = "Favorites could not be saved; kept in memory".into();
                }
                Task::none()
            }
            Message::Foreground => {
                match state.app.enter_foreground() {
                    ReconcileOutcome::LoadedFromStorage => {
                        state.push_history("Favorites reloaded from storage".into())
                    }
                    ReconcileOutcome::StorageUnavailable => {
                        state.status = "Favorites storage unavailable".into()
                    }
                    ReconcileOutcome::KeptInMemory => {}
                }
                if state.backgrounded {
                    state.backgrounded = false;
                    state.start_selected()
                } else {
                    Task::none()
                }
            }
            Message::CloseRequested => {
                for screen in &mut state.screens {
                    screen.disappear();
                }
                if !state.app.enter_background() {
                    warn!("exiting with unsaved favorites");
                }
                iced::exit()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let selected = state.screen(state.selected);
        let surface = selected.surface();
        let favorites = state.app.favorites();
        let feed_id = state.selected.id();

        let tabs = Feed::ALL.iter().fold(Row::new().spacing(6), |tabs, feed| {
            let label = if *feed == state.selected {
                format!("[{}]", feed.title())
            } else {
                feed.title().to_string()
            };
            tabs.push(button(text(label).size(14)).on_press(Message::SelectFeed(*feed)).padding(8))
        });

        let header = row![
            text(selected.status_line()).size(22),
            button("Refresh").on_press(Message::Retry).padding(8),
        ]
        .spacing(16)
        .align_y(Alignment::Center);

        let banner = if surface.loading {
            text("Loading...").size(14)
        } else if let Some(err) = &surface.error {
            text(format!("Load failed: {err}")).size(14)
        } else {
            text(format!("{} refreshes", surface.refreshes)).size(14)
        };

        let record_list = if surface.records.is_empty() {
            Column::new().push(text("No records to show").size(12))
        } else {
            surface
                .records
                .iter()
                .fold(Column::new().spacing(4), |col, record| {
                    let identity = record.identity();
                    let star = if favorites.is_favorite(feed_id, &identity) {
                        "*"
                    } else {
                        "-"
                    };
                    col.push(
                        row![
                            button(text(star).size(12))
                                .on_press(Message::ToggleFavorite(state.selected, identity))
                                .padding(4),
                            text(format!(
                                "{} | {} ({})",
                                record.display_name(),
                                record.status(),
                                record.status_level()
                            ))
                            .size(12),
                        ]
                        .spacing(8)
                        .align_y(Alignment::Center),
                    )
                })
        };

        let starred_ids = favorites.favorites(feed_id);
        let map = Canvas::new(RecordMap::new(&surface.records, &starred_ids))
            .width(Length::Fill)
            .height(Length::Fixed(320.0));

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let list_column = column![
            text("Records").size(18),
            Container::new(scrollable(record_list).height(Length::Fill)).padding(6),
        ]
        .spacing(10)
        .width(Length::Fixed(420.0));

        let map_column = column![
            text("Map (colour = status level, ring = starred)").size(16),
            map,
            text(&state.status).size(14),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(140.0))).padding(6),
        ]
        .spacing(10)
        .width(Length::Fill);

        let layout = column![
            tabs,
            header,
            banner,
            row![list_column, map_column]
                .spacing(20)
                .align_y(Alignment::Start),
        ]
        .spacing(12)
        .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn screen(&self, feed: Feed) -> &FeedScreen {
        let index = Feed::ALL.iter().position(|f| *f == feed).unwrap_or(0);
        &self.screens[index]
    }

    fn screen_mut(&mut self, feed: Feed) -> &mut FeedScreen {
        let index = Feed::ALL.iter().position(|f| *f == feed).unwrap_or(0);
        &mut self.screens[index]
    }

    fn start_selected(&mut self) -> Task<Message> {
        let feed = self.selected;
        let pending = self.screen_mut(feed).appear();
        Task::perform(pending.run(), move |outcome| {
            Message::CycleFinished(feed, outcome)
        })
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 40 {
            self.history.remove(0);
        }
    }
}

fn level_color(level: StatusLevel) -> Color {
    match level {
        StatusLevel::Unknown => Color::from_rgb(0.5, 0.5, 0.5),
        StatusLevel::Inactive => Color::from_rgb(0.3, 0.3, 0.35),
        StatusLevel::Normal => Color::from_rgb(0.25, 0.75, 0.35),
        StatusLevel::Attention => Color::from_rgb(0.95, 0.8, 0.2),
        StatusLevel::Alert => Color::from_rgb(0.95, 0.55, 0.2),
        StatusLevel::Critical => Color::from_rgb(0.9, 0.15, 0.15),
    }
}

struct MapPoint {
    latitude: f64,
    longitude: f64,
    level: StatusLevel,
    starred: bool,
}

/// Positioned records projected onto their own bounding box.
struct RecordMap {
    points: Vec<MapPoint>,
}

impl RecordMap {
    fn new(records: &[Record], starred: &[String]) -> Self {
        let points = records
            .iter()
            .filter_map(|record| {
                let coordinate = record.coordinate()?;
                Some(MapPoint {
                    latitude: coordinate.latitude(),
                    longitude: coordinate.longitude(),
                    level: record.status_level(),
                    starred: starred.contains(&record.identity()),
                })
            })
            .collect();
        Self { points }
    }
}

impl canvas::Program<Message> for RecordMap {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.02, 0.02, 0.04),
        );

        let margin = 14.0;
        let width = (bounds.width - 2.0 * margin).max(1.0);
        let height = (bounds.height - 2.0 * margin).max(1.0);

        let grid = Path::new(|builder| {
            for step in 1..4 {
                let x = margin + width * step as f32 / 4.0;
                let y = margin + height * step as f32 / 4.0;
                builder.move_to(Point::new(x, margin));
                builder.line_to(Point::new(x, margin + height));
                builder.move_to(Point::new(margin, y));
                builder.line_to(Point::new(margin + width, y));
            }
        });
        frame.stroke(
            &grid,
            Stroke::default()
                .with_color(Color::from_rgb(0.2, 0.2, 0.26))
                .with_width(1.0),
        );

        if self.points.is_empty() {
            return vec![frame.into_geometry()];
        }

        let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
        for point in &self.points {
            min_lat = min_lat.min(point.latitude);
            max_lat = max_lat.max(point.latitude);
            min_lon = min_lon.min(point.longitude);
            max_lon = max_lon.max(point.longitude);
        }
        let lat_span = (max_lat - min_lat).max(1e-3);
        let lon_span = (max_lon - min_lon).max(1e-3);

        for point in &self.points {
            let x = margin + ((point.longitude - min_lon) / lon_span) as f32 * width;
            let y = margin + height - ((point.latitude - min_lat) / lat_span) as f32 * height;
            let center = Point::new(x, y);

            let marker = Path::new(|builder| builder.circle(center, 4.5));
            frame.fill(&marker, level_color(point.level));
            if point.starred {
                let ring = Path::new(|builder| builder.circle(center, 8.0));
                frame.stroke(
                    &ring,
                    Stroke::default()
                        .with_color(Color::from_rgb(0.95, 0.95, 0.95))
                        .with_width(1.5),
                );
            }
        }

        vec![frame.into_geometry()]
    }
}
