#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use melody_sequencer::{
    sequencer::{MAX_TEMPO, MIN_TEMPO},
    storage::export_file_name,
    AudioSink, Config, Engine, PlaybackEvent, Pitch, Result, SilentSink, STEPS,
};
#[cfg(feature = "gui")]
use std::path::PathBuf;
#[cfg(feature = "gui")]
use std::sync::Arc;
#[cfg(feature = "gui")]
use std::time::{Duration, Instant};

#[cfg(feature = "gui")]
const STATUS_TIMEOUT: Duration = Duration::from_millis(2500);

#[cfg(feature = "gui")]
fn main() -> std::result::Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = match SequencerApp::new(Config::from_env()) {
        Ok(app) => app,
        Err(err) => {
            log::error!("Failed to start sequencer: {}", err);
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Melody Sequencer"),
        ..Default::default()
    };

    eframe::run_native(
        "Melody Sequencer",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(all(feature = "gui", feature = "audio"))]
fn open_audio() -> (Option<melody_sequencer::AudioOutput>, Arc<dyn AudioSink>) {
    match melody_sequencer::AudioOutput::new() {
        Ok(output) => {
            let sink: Arc<dyn AudioSink> = Arc::new(output.sink());
            (Some(output), sink)
        }
        Err(err) => {
            log::warn!("{}. Audio playback disabled.", err);
            (None, Arc::new(SilentSink))
        }
    }
}

#[cfg(all(feature = "gui", not(feature = "audio")))]
fn open_audio() -> (Option<()>, Arc<dyn AudioSink>) {
    log::warn!("Built without the 'audio' feature. Audio playback disabled.");
    (None, Arc::new(SilentSink))
}

#[cfg(feature = "gui")]
struct Status {
    text: String,
    is_error: bool,
    shown_at: Instant,
}

#[cfg(feature = "gui")]
struct SequencerApp {
    engine: Engine,
    #[cfg(feature = "audio")]
    _audio_output: Option<melody_sequencer::AudioOutput>,

    // UI state
    selected_slot: usize,
    current_visual_step: Option<usize>,
    file_path: String,
    status: Option<Status>,
}

#[cfg(feature = "gui")]
impl SequencerApp {
    fn new(config: Config) -> Result<Self> {
        #[cfg_attr(not(feature = "audio"), allow(unused_variables))]
        let (audio_output, sink) = open_audio();
        let engine = Engine::new(config, sink)?;

        Ok(Self {
            engine,
            #[cfg(feature = "audio")]
            _audio_output: audio_output,
            selected_slot: 0,
            current_visual_step: None,
            file_path: export_file_name(0),
            status: None,
        })
    }

    fn handle_playback_events(&mut self) {
        for event in self.engine.poll_events() {
            match event {
                PlaybackEvent::StepAdvanced(step) => self.current_visual_step = Some(step),
                PlaybackEvent::NoteTriggered(_) => {}
                PlaybackEvent::Stopped => self.current_visual_step = None,
            }
        }
    }

    fn show_message(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(Status {
            text: text.into(),
            is_error,
            shown_at: Instant::now(),
        });
    }

    fn report<T>(&mut self, result: Result<T>, success: String) {
        match result {
            Ok(_) => self.show_message(success, false),
            Err(err) => {
                log::warn!("{}", err);
                self.show_message(err.to_string(), true);
            }
        }
    }

    fn select_slot(&mut self, slot: usize) {
        self.selected_slot = slot;
        self.file_path = export_file_name(slot);
        self.show_message(format!("Selected Slot {}", slot + 1), false);
    }

    fn clear_grid(&mut self) {
        self.engine.clear_pattern();
        self.show_message("Grid cleared", false);
    }

    fn save_pattern(&mut self) {
        let slot = self.selected_slot;
        let result = self.engine.save_to_slot(slot);
        self.report(result, format!("Pattern saved to Slot {}!", slot + 1));
    }

    fn load_pattern(&mut self) {
        let slot = self.selected_slot;
        let result = self.engine.load_from_slot(slot);
        self.report(result, format!("Pattern loaded from Slot {}!", slot + 1));
    }

    fn delete_slot(&mut self) {
        let slot = self.selected_slot;
        let result = self.engine.delete_slot(slot);
        self.report(result, format!("Slot {} cleared!", slot + 1));
    }

    fn export_pattern(&mut self) {
        let path = PathBuf::from(self.file_path.trim());
        let result = self.engine.export_slot(self.selected_slot, &path);
        self.report(result, format!("Pattern exported to {}", path.display()));
    }

    fn import_pattern(&mut self) {
        let path = PathBuf::from(self.file_path.trim());
        let result = self.engine.import_to_slot(&path, self.selected_slot);
        self.report(result, "Pattern imported successfully!".to_string());
    }

    fn grid_ui(&mut self, ui: &mut egui::Ui) {
        let pattern = self.engine.snapshot_pattern();
        let mut clicked = None;

        for pitch in Pitch::ALL {
            ui.horizontal(|ui| {
                ui.add_sized([24.0, 40.0], egui::Label::new(pitch.letter()));
                for step in 0..STEPS {
                    let is_current = self.current_visual_step == Some(step);
                    let fill = if is_current {
                        egui::Color32::from_rgb(251, 191, 36)
                    } else if pattern.grid.get(pitch.row(), step) {
                        egui::Color32::from_rgb(79, 70, 229)
                    } else {
                        egui::Color32::from_rgb(40, 40, 40)
                    };

                    let button = egui::Button::new("")
                        .min_size(egui::vec2(48.0, 40.0))
                        .fill(fill);
                    if ui.add(button).clicked() {
                        clicked = Some((pitch.row(), step));
                    }
                }
            });
        }

        if let Some((row, step)) = clicked {
            if let Err(err) = self.engine.toggle_cell(row, step) {
                self.show_message(err.to_string(), true);
            }
        }
    }

    fn slots_ui(&mut self, ui: &mut egui::Ui) {
        let occupied = self.engine.slots().occupied();
        let mut selected = None;

        ui.horizontal(|ui| {
            ui.label("Slots:");
            for (slot, has_data) in occupied.into_iter().enumerate() {
                let fill = if has_data {
                    egui::Color32::from_rgb(79, 70, 229)
                } else {
                    egui::Color32::from_rgb(120, 120, 120)
                };
                let button = egui::Button::new(format!("{}", slot + 1))
                    .min_size(egui::vec2(48.0, 36.0))
                    .fill(fill)
                    .selected(slot == self.selected_slot);
                if ui.add(button).clicked() {
                    selected = Some(slot);
                }
            }
        });

        if let Some(slot) = selected {
            self.select_slot(slot);
        }
    }
}

#[cfg(feature = "gui")]
impl eframe::App for SequencerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events();

        if self
            .status
            .as_ref()
            .is_some_and(|status| status.shown_at.elapsed() >= STATUS_TIMEOUT)
        {
            self.status = None;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Melody Sequencer");
            ui.label("Create, play, and save your melody patterns!");
            ui.add_space(10.0);

            self.grid_ui(ui);
            ui.add_space(10.0);
            self.slots_ui(ui);
            ui.add_space(10.0);

            // Transport controls
            ui.horizontal(|ui| {
                if self.engine.is_playing() {
                    if ui.button("⏹ Stop").clicked() {
                        self.engine.stop_playback();
                    }
                } else if ui.button("▶ Play").clicked() {
                    self.engine.start_playback();
                }

                if ui.button("🗑 Clear").clicked() {
                    self.clear_grid();
                }

                ui.add_space(20.0);

                ui.label("BPM:");
                let mut bpm = self.engine.tempo().bpm();
                if ui
                    .add(egui::Slider::new(&mut bpm, MIN_TEMPO..=MAX_TEMPO).step_by(1.0))
                    .changed()
                {
                    if let Err(err) = self.engine.set_tempo(bpm as i64) {
                        self.show_message(err.to_string(), true);
                    }
                }
            });

            ui.add_space(10.0);

            // Slot storage
            ui.horizontal(|ui| {
                if ui.button("💾 Save").clicked() {
                    self.save_pattern();
                }
                if ui.button("📂 Load").clicked() {
                    self.load_pattern();
                }
                if ui.button("🗑 Delete Slot").clicked() {
                    self.delete_slot();
                }
            });

            // Portable files
            ui.horizontal(|ui| {
                ui.label("File:");
                ui.text_edit_singleline(&mut self.file_path);
                if ui.button("📥 Export").clicked() {
                    self.export_pattern();
                }
                if ui.button("📤 Import").clicked() {
                    self.import_pattern();
                }
            });

            ui.separator();
            if let Some(status) = &self.status {
                let color = if status.is_error {
                    egui::Color32::from_rgb(220, 38, 38)
                } else {
                    egui::Color32::from_rgb(22, 163, 74)
                };
                ui.colored_label(color, &status.text);
            }
        });
    }
}
