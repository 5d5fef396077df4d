mod app;
mod model;
mod storage;

fn main() -> eframe::Result<()> {
    env_logger::init();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Moodboard",
        native_options,
        Box::new(|cc| Ok(Box::new(app::BoardApp::new(cc)))),
    )
}
