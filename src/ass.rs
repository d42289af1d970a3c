use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::config::StyleConfig;
use crate::cues::Cue;
use crate::error::Result;

const UTF8_BOM: &str = "\u{feff}";

/// Render cues as an Advanced SubStation Alpha script
pub fn render_ass(cues: &[Cue], play_res_x: u32, play_res_y: u32, style: &StyleConfig) -> String {
    let mut ass = format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         PlayResX: {play_res_x}\n\
         PlayResY: {play_res_y}\n\
         ScaledBorderAndShadow: yes\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,{font},{size},{primary},&H00000000,{outline_colour},&H00000000,0,0,0,0,100,100,0,0,1,{outline},{shadow},{alignment},20,20,{margin_v},1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
        font = style.font_name,
        size = style.font_size,
        primary = style.primary_colour,
        outline_colour = style.outline_colour,
        outline = style.outline,
        shadow = style.shadow,
        alignment = style.alignment,
        margin_v = style.margin_v,
    );

    for cue in cues {
        let text = escape_ass_text(cue.text.trim());
        if text.is_empty() {
            continue;
        }

        let x = cue.pos.0.clamp(0, play_res_x as i64);
        let y = cue.pos.1.clamp(0, play_res_y as i64);
        ass.push_str(&format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{{\\pos({},{})}}{}\n",
            format_ass_time(cue.start),
            format_ass_time(cue.end),
            x,
            y,
            text
        ));
    }

    ass
}

/// Write the script as UTF-8 with a byte order mark
pub async fn write_ass<P: AsRef<Path>>(
    cues: &[Cue],
    output_path: P,
    play_res_x: u32,
    play_res_y: u32,
    style: &StyleConfig,
) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating ASS file: {}", output_path.display());

    let content = format!("{}{}", UTF8_BOM, render_ass(cues, play_res_x, play_res_y, style));
    fs::write(output_path, content).await?;

    info!("ASS file generated with {} cue(s)", cues.len());
    Ok(())
}

/// Escape override braces, backslashes and line breaks
pub fn escape_ass_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\N"),
            _ => out.push(c),
        }
    }
    out
}

/// Format time in seconds as ASS time (H:MM:SS.CC)
pub fn format_ass_time(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = total_cs / 360_000;
    let minutes = (total_cs % 360_000) / 6_000;
    let secs = (total_cs % 6_000) / 100;
    let cs = total_cs % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, cs)
}
