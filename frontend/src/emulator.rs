use std::path::Path;
use std::time::{Duration, Instant};

use lumen_core::core::machine::{HOTKEY_NETPLAY_NEXT, HOTKEY_REMOTE_SIGNAL, Machine};
use sdl2::event::Event;
use sdl2::keyboard::Scancode;

use crate::audio;
use crate::input::KeyMap;
use crate::video::{PanelWindow, PANEL_FRAME_BYTES, PANEL_H, PANEL_W};

pub fn run(machine: &mut dyn Machine, key_map: &KeyMap, scale: u32, state_path: &Path) {
    let sdl_context = sdl2::init().expect("Failed to initialize SDL2");
    let sdl_video = sdl_context.video().expect("Failed to init SDL video");
    let sdl_audio = sdl_context.audio().expect("Failed to init SDL audio");

    // The presenter is hardwired to the 96x64 panel.
    debug_assert_eq!(machine.display_size(), (PANEL_W, PANEL_H));

    let mut video = PanelWindow::new(&sdl_video, "Lumen", scale);
    let mut event_pump = sdl_context.event_pump().expect("Failed to get event pump");

    let audio_out = audio::init(&sdl_audio, machine.audio_sample_rate());
    if let Some((device, _, _)) = &audio_out {
        device.resume();
    }

    let mut framebuffer = vec![0u8; PANEL_FRAME_BYTES];

    // Samples the machine produces per host frame.
    let samples_per_frame =
        (machine.audio_sample_rate() as f64 / machine.frame_rate_hz()).ceil() as usize;
    let mut audio_chunk = vec![0i16; samples_per_frame];

    let frame_duration = Duration::from_secs_f64(1.0 / machine.frame_rate_hz());
    let mut next_frame = Instant::now();

    let mut fps_count = 0u32;
    let mut fps_clock = Instant::now();

    'main: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => break 'main,

                Event::KeyDown {
                    scancode: Some(sc),
                    repeat: false,
                    ..
                } => match sc {
                    Scancode::Escape => break 'main,

                    Scancode::F1 => {
                        let state = machine.save_state();
                        match std::fs::write(state_path, state) {
                            Ok(()) => log::info!("saved state to {}", state_path.display()),
                            Err(err) => log::warn!("save state failed: {err}"),
                        }
                    }

                    Scancode::F2 => match std::fs::read(state_path) {
                        Ok(data) => match machine.load_state(&data) {
                            Ok(()) => log::info!("loaded state from {}", state_path.display()),
                            Err(err) => log::warn!("load state failed: {err}"),
                        },
                        Err(err) => log::warn!("load state failed: {err}"),
                    },

                    Scancode::F3 => machine.hotkey(HOTKEY_NETPLAY_NEXT),
                    Scancode::F4 => machine.hotkey(HOTKEY_REMOTE_SIGNAL),

                    Scancode::F9 => screenshot(&framebuffer),

                    _ => {
                        if let Some(button_id) = key_map.get(sc) {
                            machine.set_input(button_id, true);
                        }
                    }
                },

                Event::KeyUp {
                    scancode: Some(sc), ..
                } => {
                    if let Some(button_id) = key_map.get(sc) {
                        machine.set_input(button_id, false);
                    }
                }

                _ => {}
            }
        }

        machine.run_frame();

        machine.render_frame(&mut framebuffer);
        video.present(&framebuffer);

        // Feed the PWM sample ring from the emulator thread; the SDL
        // callback drains it at the device rate.
        if let Some((_, ring, _)) = &audio_out {
            let produced = machine.fill_audio(&mut audio_chunk);
            audio::queue(ring, &audio_chunk[..produced]);
        }

        fps_count += 1;
        if fps_clock.elapsed() >= Duration::from_secs(1) {
            video.set_title(&format!("Lumen - {fps_count} FPS"));
            fps_count = 0;
            fps_clock = Instant::now();
        }

        next_frame += frame_duration;
        let now = Instant::now();
        if next_frame > now {
            std::thread::sleep(next_frame - now);
        } else {
            // Fell behind; resynchronize instead of fast-forwarding.
            next_frame = now;
        }
    }

    if let Some((device, _, shutdown)) = &audio_out {
        shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
        std::thread::sleep(audio::drain_duration());
        device.pause();
    }
}

/// Dump the current panel frame as a PNG named by timestamp.
fn screenshot(framebuffer: &[u8]) {
    let name = format!(
        "lumen_{}.png",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    );

    let file = match std::fs::File::create(&name) {
        Ok(file) => file,
        Err(err) => {
            log::warn!("screenshot failed: {err}");
            return;
        }
    };

    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), PANEL_W, PANEL_H);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let result = encoder
        .write_header()
        .and_then(|mut writer| writer.write_image_data(framebuffer));

    match result {
        Ok(()) => log::info!("saved screenshot {name}"),
        Err(err) => log::warn!("screenshot failed: {err}"),
    }
}
