//! Prompt form: egui app state and UI.

use eframe::egui;
use std::sync::mpsc;
use wxgem::config::{self, GeminiConfig};
use wxgem::form::PromptForm;
use wxgem::llm::{GeminiClient, TextGenerator};

const INPUT_ROWS: usize = 6;
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(200, 60, 60);

type TurnResult = Result<Option<String>, String>;

/// Gemini settings resolved at startup; a client is built per request on the worker thread.
#[derive(Clone)]
struct ApiSettings {
    gemini: GeminiConfig,
    api_key: String,
}

pub struct PromptApp {
    form: PromptForm,
    /// None when config could not be loaded or the API key is missing; see `setup_error`.
    api: Option<ApiSettings>,
    setup_error: Option<String>,
    turn_receiver: Option<mpsc::Receiver<TurnResult>>,
}

impl PromptApp {
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (api, setup_error) = match load_api_settings() {
            Ok(api) => (Some(api), None),
            Err(e) => {
                log::error!("prompt form setup failed: {}", e);
                (None, Some(e))
            }
        };
        Self {
            form: PromptForm::new(),
            api,
            setup_error,
            turn_receiver: None,
        }
    }

    /// Start a request in a background thread if the form accepts the input.
    fn start_turn(&mut self, ctx: &egui::Context) {
        let Some(api) = self.api.clone() else {
            return;
        };
        let Some(prompt) = self.form.submit() else {
            return;
        };
        let (tx, rx) = mpsc::channel();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = run_generate(api, &prompt);
            let _ = tx.send(result);
            ctx.request_repaint();
        });
        self.turn_receiver = Some(rx);
    }

    /// Poll for the request result and clear the receiver when done. Call each frame.
    fn poll_turn(&mut self) {
        let Some(rx) = &self.turn_receiver else {
            return;
        };
        match rx.try_recv() {
            Ok(result) => {
                self.turn_receiver = None;
                self.form.finish(result);
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.turn_receiver = None;
                self.form.fail("request worker stopped unexpectedly");
            }
        }
    }
}

fn load_api_settings() -> Result<ApiSettings, String> {
    let (config, _) = config::load_config(None).map_err(|e| format!("{:#}", e))?;
    let api_key = config::resolve_gemini_api_key(&config).ok_or_else(|| {
        format!(
            "Gemini API key not configured (set {} or gemini.apiKey)",
            config::GEMINI_API_KEY_ENV
        )
    })?;
    Ok(ApiSettings {
        gemini: config.gemini,
        api_key,
    })
}

/// One blocking generate call on a private current-thread runtime.
fn run_generate(api: ApiSettings, prompt: &str) -> TurnResult {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string())?;
    rt.block_on(async move {
        let client = GeminiClient::new(&api.gemini, api.api_key).map_err(|e| e.to_string())?;
        client.generate(prompt).await.map_err(|e| e.to_string())
    })
}

impl eframe::App for PromptApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_turn();

        let mut submit = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Ask Gemini");
            ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

            if let Some(ref e) = self.setup_error {
                ui.colored_label(ERROR_COLOR, e);
                return;
            }

            let enabled = !self.form.is_loading();
            ui.add_enabled(
                enabled,
                egui::TextEdit::multiline(&mut self.form.input)
                    .hint_text("Type a prompt (Ctrl+Enter to send)")
                    .desired_rows(INPUT_ROWS)
                    .desired_width(f32::INFINITY),
            );
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(enabled, egui::Button::new("Generate"))
                    .clicked()
                {
                    submit = true;
                }
                if self.form.is_loading() {
                    ui.spinner();
                    ui.label("Generating…");
                }
            });
            if enabled && ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }

            ui.add_space(12.0);
            ui.separator();
            ui.add_space(12.0);

            if let Some(e) = self.form.error() {
                ui.colored_label(ERROR_COLOR, e);
            }
            if let Some(text) = self.form.response() {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.add(egui::Label::new(text).wrap(true));
                    });
            }
        });

        if submit {
            self.start_turn(ctx);
        }
    }
}
