//! `xcompositord`: a minimal compositing manager for X11.
//!
//! Flag parsing is intentionally small — this is not a drop-in
//! replacement for any particular existing compositor's CLI surface, just
//! enough knobs to exercise every [`CompositorSettings`] field from the
//! command line.

use std::process::ExitCode;

use xcompositor::display::x11::X11Display;
use xcompositor::display::Display;
use xcompositor::{CompositeMode, Compositor, CompositorError, CompositorSettings};

struct Args {
    display_name: Option<String>,
    auto_redirect: bool,
    settings: CompositorSettings,
}

fn parse_args() -> Args {
    let mut settings = CompositorSettings::default();
    let mut display_name = None;
    let mut auto_redirect = false;

    let mut argv = std::env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "-d" => display_name = argv.next(),
            "-a" => auto_redirect = true,
            "-S" => settings = settings.with_synchronize(true),
            "-f" => settings = settings.with_fade_on_map_unmap(true),
            "-F" => settings = settings.with_fade_on_opacity_change(true),
            "-C" => settings = settings.with_exclude_dock_shadows(true),
            "-m" => settings = settings.with_debug_monitor_repaint(true),
            "-c" => settings = settings.with_mode(CompositeMode::ClientShadows),
            "-s" => settings = settings.with_mode(CompositeMode::ServerShadows),
            "-n" => settings = settings.with_mode(CompositeMode::Simple),
            "-r" => {
                if let Some(v) = argv.next().and_then(|s| s.parse().ok()) {
                    settings = settings.with_shadow_radius(v);
                }
            }
            "-o" => {
                if let Some(v) = argv.next().and_then(|s| s.parse().ok()) {
                    settings = settings.with_shadow_opacity(v);
                }
            }
            "-l" | "-t" => {
                if let Some(v) = argv.next().and_then(|s| s.parse().ok()) {
                    let (x, y) = settings.shadow_offset();
                    let (x, y) = if arg == "-l" { (v, y) } else { (x, v) };
                    settings = settings.with_shadow_offset(x, y);
                }
            }
            "-I" | "-O" => {
                if let Some(v) = argv.next().and_then(|s| s.parse().ok()) {
                    let (fade_in, fade_out) = (settings.fade_in_step, settings.fade_out_step);
                    let (fade_in, fade_out) = if arg == "-I" { (v, fade_out) } else { (fade_in, v) };
                    settings = settings.with_fade_steps(fade_in, fade_out);
                }
            }
            "-D" => {
                if let Some(v) = argv.next().and_then(|s| s.parse().ok()) {
                    settings = settings.with_fade_delta_ms(v);
                }
            }
            _ => {}
        }
    }

    Args { display_name, auto_redirect, settings }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = parse_args();

    let mut display = match X11Display::connect(args.display_name.as_deref()) {
        Ok(d) => d,
        Err(err) => {
            log::error!("failed to connect to X server: {err}");
            return ExitCode::FAILURE;
        }
    };

    if args.auto_redirect {
        // §1's "trivial non-compositing branch": ask the server to redirect
        // and composite subwindows on our behalf, then get out of the way.
        return match display.redirect_subwindows(true) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                log::error!("failed to enable automatic redirection: {err}");
                ExitCode::FAILURE
            }
        };
    }

    let screen = display.screen_num();
    let mut compositor = match Compositor::start(&mut display, screen, args.settings) {
        Ok(c) => c,
        Err(CompositorError::AnotherManagerRunning(name)) => {
            eprintln!("another composite manager is already running: {name}");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            log::error!("failed to start compositor: {err}");
            return ExitCode::FAILURE;
        }
    };

    loop {
        if let Err(err) = compositor.run_iteration(&mut display) {
            log::error!("event loop iteration failed: {err}");
            return ExitCode::FAILURE;
        }
    }
}
