use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};

/// Width of the banner frame, excluding the corner characters.
const BANNER_WIDTH: usize = 60;

/// Print info on console.
pub fn info(message: &str) {
    println!("{}", Cyan.bold().italic().paint(message));
}

/// Print a success line on console.
pub fn success(message: &str) {
    println!("{}", Green.bold().paint(message));
}

/// Print warning on console.
pub fn warn(message: &str, data: &str) {
    println!(
        "{} \n {} ",
        Yellow.bold().italic().paint(message),
        Red.bold().italic().paint(data)
    );
}

/// Print an error on the console's standard error.
pub fn error(message: &str, data: &str) {
    eprintln!(
        "{} \n {} ",
        Red.bold().paint(message),
        Red.italic().paint(data)
    );
}

/// Print the startup banner.
pub fn banner(title: &str, subtitle: &str) {
    for line in banner_lines(title, subtitle) {
        println!("{}", Cyan.bold().paint(line));
    }
}

/// Builds the framed banner, one string per line. Text longer than the frame is not truncated.
pub fn banner_lines(title: &str, subtitle: &str) -> Vec<String> {
    let border = format!("+{}+", "-".repeat(BANNER_WIDTH));
    let row = |text: &str| format!("|{:^width$}|", text, width = BANNER_WIDTH);
    vec![
        border.clone(),
        row(""),
        row(title),
        row(subtitle),
        row(""),
        border,
    ]
}
