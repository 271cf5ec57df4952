use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use std::io::{Result, stdout};

use crate::error::AppError;

/// Enter the alternate screen and make sure Ctrl-C or a panic restores the
/// terminal before the process dies.
pub fn init_terminal() -> std::result::Result<(), AppError> {
    initial_terminal_state()?;
    ctrlc::set_handler(|| {
        let _ = restore_terminal();
        std::process::exit(130);
    })
    .map_err(|e| AppError::Io(std::io::Error::other(e)))?;

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        prev_hook(panic_info);
    }));
    Ok(())
}

pub fn initial_terminal_state() -> Result<()> {
    let mut stdout = stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Clear(ClearType::All), Hide)?;
    execute!(stdout, EnableMouseCapture)?;
    Ok(())
}

pub fn restore_terminal() -> Result<()> {
    let mut stdout = stdout();
    execute!(
        stdout,
        Clear(ClearType::All),
        Show,
        MoveTo(0, 0),
        LeaveAlternateScreen
    )?;
    execute!(stdout, DisableMouseCapture)?;
    disable_raw_mode()?;
    Ok(())
}
