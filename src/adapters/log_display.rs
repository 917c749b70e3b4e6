//! Display adapter for boards without a panel: every draw call becomes a
//! log line. Works on any bus type since it never touches the bus.

use log::info;

use crate::app::ports::StatusDisplay;
use crate::ui::Screen;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisplay;

impl<B> StatusDisplay<B> for LogDisplay {
    fn clear(&mut self, _bus: &mut B) {
        info!("DISP | clear");
    }

    fn append_status_line(&mut self, _bus: &mut B, line: &str) {
        info!("DISP | {}", line);
    }

    fn write_header(&mut self, _bus: &mut B, title: &str) {
        info!("DISP | == {} ==", title);
    }

    fn render_menu(&mut self, _bus: &mut B, screen: Screen, highlighted: u8, entry_count: u8) {
        let entries = screen.entries();
        for (i, label) in entries.iter().enumerate().take(entry_count as usize) {
            let mark = if i == highlighted as usize { '>' } else { ' ' };
            info!("DISP | {} {}", mark, label);
        }
    }

    fn set_power(&mut self, _bus: &mut B, on: bool) {
        info!("DISP | power {}", if on { "on" } else { "off" });
    }
}
