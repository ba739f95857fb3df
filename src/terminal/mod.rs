use crossterm::{
    cursor::{Hide, Show as ShowCursor},
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{stdout, BufWriter};
use std::time::{Duration, Instant};
use tracing::info;

use pyroshow::{Show, ShowConfig, Stage};

mod input;
mod renderer;

use input::{Action, InputState};
use renderer::{Renderer, STAGE_SCALE};

const FIXED_DT: f32 = 1.0 / 60.0;
/// Speed bar edge padding in stage pixels, so 0 and 1 are easy to hit.
const SPEED_BAR_EDGE: f32 = 16.0;

pub struct Options {
    pub bg_color: (u8, u8, u8),
    pub seed: Option<u64>,
}

/// Run the show until the user quits. Returns the final configuration so
/// the caller can persist it.
pub fn run(config: ShowConfig, options: &Options) -> std::io::Result<ShowConfig> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All), EnableMouseCapture)?;

    let (cols, rows) = terminal::size()?;
    let mut renderer = Renderer::new(cols, rows, options.bg_color);
    let (width, height) = renderer.stage_size();
    let stage = Stage::new(width, height);
    let mut show = match options.seed {
        Some(seed) => Show::with_seed(stage, config, seed),
        None => Show::new(stage, config),
    };
    info!(cols, rows, width, height, "show started");

    let result = run_loop(&mut show, &mut renderer, &mut stdout, rows);

    execute!(stdout, ShowCursor, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal::disable_raw_mode()?;

    result?;
    info!(frames = show.frame(), "show stopped");
    Ok(show.config().clone())
}

fn run_loop(
    show: &mut Show,
    renderer: &mut Renderer,
    stdout: &mut BufWriter<std::io::Stdout>,
    mut rows: u16,
) -> std::io::Result<()> {
    let mut input = InputState::default();
    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;

    loop {
        while event::poll(Duration::from_millis(1))? {
            let event = event::read()?;
            let Some(action) = input.action_for(&event, rows) else {
                continue;
            };
            match action {
                Action::Quit => return Ok(()),
                Action::Resize(new_cols, new_rows) => {
                    rows = new_rows;
                    *renderer = Renderer::new(new_cols, new_rows, renderer.bg_color());
                    let (width, height) = renderer.stage_size();
                    show.resize(width, height);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                other => apply(other, show, renderer),
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        accumulator += frame_time;
        if accumulator > FIXED_DT * 3.0 {
            accumulator = FIXED_DT * 3.0;
        }

        while accumulator >= FIXED_DT {
            if !show.is_paused() {
                show.update(FIXED_DT * 1000.0, 1.0);
                renderer.fade(show, 1.0);
            }
            accumulator -= FIXED_DT;
        }

        renderer.render(show, stdout)?;
    }
}

fn apply(action: Action, show: &mut Show, renderer: &mut Renderer) {
    // Launches and speed changes wait for the show to resume.
    if show.is_paused()
        && matches!(
            action,
            Action::LaunchRandom
                | Action::LaunchAt(..)
                | Action::SpeedFromColumn(_)
                | Action::NudgeSpeed(_)
        )
    {
        return;
    }
    match action {
        Action::TogglePause => show.toggle_pause(),
        Action::LaunchRandom => {
            show.launch_from_config();
        }
        Action::LaunchAt(col, row) => {
            let x = (f32::from(col) + 0.5) * STAGE_SCALE;
            let y = (f32::from(row) + 0.5) * STAGE_SCALE;
            show.launch_at(x, y);
        }
        Action::SpeedFromColumn(col) => {
            let width = show.stage().width;
            let x = (f32::from(col) + 0.5) * STAGE_SCALE;
            show.set_sim_speed((x - SPEED_BAR_EDGE) / (width - SPEED_BAR_EDGE * 2.0));
            renderer.speed_bar_opacity = 1.0;
        }
        Action::NudgeSpeed(delta) => {
            show.set_sim_speed(show.sim_speed() + delta);
            renderer.speed_bar_opacity = 1.0;
        }
        Action::SetSize(size) => show.update_config(|c| c.size = size),
        Action::NextShell => show.update_config(|c| c.shell = c.shell.next()),
        Action::CycleQuality => show.update_config(|c| c.quality = c.quality.next()),
        Action::CycleSky => show.update_config(|c| c.sky_lighting = c.sky_lighting.next()),
        Action::ToggleFinale => show.update_config(|c| c.finale = !c.finale),
        Action::ToggleAutoLaunch => show.update_config(|c| c.auto_launch = !c.auto_launch),
        Action::ToggleLongExposure => show.update_config(|c| c.long_exposure = !c.long_exposure),
        Action::Reload => show.reload(),
        Action::Quit | Action::Resize(..) => {}
    }
}
