//! Line-based edit scripts: tool selection, pointer input and export for one document.

use kurbo::Point;

use crate::editor::Editor;
use crate::error::{AppError, AppResult};
use crate::export::ExportReport;
use crate::pointer::PointerEvent;
use crate::tool::Mode;
use crate::writer::DocumentWriter;

const DEFAULT_DRAG_STEPS: usize = 8;

/// Page numbers are 1-based as written in the script; `page` fields hold the 0-based index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptCommand {
    Mode(Mode),
    Pointer { page: usize, event: PointerEvent },
    Drag {
        page: usize,
        from: Point,
        to: Point,
        steps: usize,
    },
    Export,
}

pub fn parse_script(text: &str) -> AppResult<Vec<ScriptCommand>> {
    let mut commands = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = match line.find('#') {
            Some(comment) => &line[..comment],
            None => line,
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = parse_script_line(line).map_err(|err| {
            AppError::invalid_argument(format!("script line {}: {}", index + 1, message(&err)))
        })?;
        commands.push(command);
    }
    Ok(commands)
}

pub fn parse_script_line(input: &str) -> AppResult<ScriptCommand> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_argument("command must not be empty"));
    }

    let (id, args_text) = match trimmed.find(char::is_whitespace) {
        Some(index) => (&trimmed[..index], trimmed[index..].trim_start()),
        None => (trimmed, ""),
    };

    match id {
        "mode" => parse_mode(args_text),
        "down" => {
            let (page, [x, y]) = parse_page_and_coords(id, args_text)?;
            Ok(ScriptCommand::Pointer {
                page,
                event: PointerEvent::down(x, y),
            })
        }
        "move" => {
            let (page, [x, y]) = parse_page_and_coords(id, args_text)?;
            Ok(ScriptCommand::Pointer {
                page,
                event: PointerEvent::moved(x, y),
            })
        }
        "up" => Ok(ScriptCommand::Pointer {
            page: parse_page_only(id, args_text)?,
            event: PointerEvent::up(),
        }),
        "leave" => Ok(ScriptCommand::Pointer {
            page: parse_page_only(id, args_text)?,
            event: PointerEvent::leave(),
        }),
        "drag" => parse_drag(args_text),
        "export" => {
            if args_text.is_empty() {
                Ok(ScriptCommand::Export)
            } else {
                Err(AppError::invalid_argument("export does not accept arguments"))
            }
        }
        _ => Err(AppError::invalid_argument(format!("unknown command: {id}"))),
    }
}

fn parse_mode(args_text: &str) -> AppResult<ScriptCommand> {
    let mut parts = args_text.split_whitespace();
    let Some(mode_text) = parts.next() else {
        return Err(AppError::invalid_argument(
            "mode requires 1 argument: stamp|erase|none",
        ));
    };
    if parts.next().is_some() {
        return Err(AppError::invalid_argument("mode accepts exactly 1 argument"));
    }

    let mode = Mode::parse(mode_text).ok_or(AppError::invalid_argument(
        "mode must be one of stamp, erase, none",
    ))?;
    Ok(ScriptCommand::Mode(mode))
}

fn parse_page_only(id: &str, args_text: &str) -> AppResult<usize> {
    let parts: Vec<&str> = args_text.split_whitespace().collect();
    let [page_text] = parts.as_slice() else {
        return Err(AppError::invalid_argument(format!(
            "{id} requires exactly 1 argument: page"
        )));
    };
    parse_page(page_text)
}

fn parse_page_and_coords(id: &str, args_text: &str) -> AppResult<(usize, [f64; 2])> {
    let parts: Vec<&str> = args_text.split_whitespace().collect();
    let [page_text, x_text, y_text] = parts.as_slice() else {
        return Err(AppError::invalid_argument(format!(
            "{id} requires exactly 3 arguments: page x y"
        )));
    };
    Ok((parse_page(page_text)?, [parse_coord(x_text)?, parse_coord(y_text)?]))
}

fn parse_drag(args_text: &str) -> AppResult<ScriptCommand> {
    let parts: Vec<&str> = args_text.split_whitespace().collect();
    let (page_text, coords, steps_text) = match parts.as_slice() {
        [page, x1, y1, x2, y2] => (*page, [*x1, *y1, *x2, *y2], None),
        [page, x1, y1, x2, y2, steps] => (*page, [*x1, *y1, *x2, *y2], Some(*steps)),
        _ => {
            return Err(AppError::invalid_argument(
                "drag requires 5 or 6 arguments: page x1 y1 x2 y2 [steps]",
            ));
        }
    };

    let page = parse_page(page_text)?;
    let [x1, y1, x2, y2] = [
        parse_coord(coords[0])?,
        parse_coord(coords[1])?,
        parse_coord(coords[2])?,
        parse_coord(coords[3])?,
    ];
    let steps = match steps_text {
        Some(text) => text
            .parse::<usize>()
            .ok()
            .filter(|steps| *steps >= 1)
            .ok_or(AppError::invalid_argument("drag steps must be an integer >= 1"))?,
        None => DEFAULT_DRAG_STEPS,
    };

    Ok(ScriptCommand::Drag {
        page,
        from: Point::new(x1, y1),
        to: Point::new(x2, y2),
        steps,
    })
}

fn parse_page(text: &str) -> AppResult<usize> {
    let page = text
        .parse::<usize>()
        .map_err(|_| AppError::invalid_argument("page must be an integer"))?;
    if page < 1 {
        return Err(AppError::invalid_argument("page number must be >= 1"));
    }
    Ok(page - 1)
}

fn parse_coord(text: &str) -> AppResult<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(AppError::invalid_argument(format!(
            "coordinate must be a finite number: {text}"
        )))
}

fn message(err: &AppError) -> String {
    match err {
        AppError::InvalidArgument(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Runs `commands` against the current session and returns one report per `export`.
pub async fn run_script(
    editor: &mut Editor,
    commands: &[ScriptCommand],
    writer: &dyn DocumentWriter,
) -> AppResult<Vec<ExportReport>> {
    let mut reports = Vec::new();
    for command in commands {
        match *command {
            ScriptCommand::Mode(mode) => editor.set_mode(mode),
            ScriptCommand::Pointer { page, event } => {
                editor.poll_render_results();
                editor.pointer_event(page, event)?;
            }
            ScriptCommand::Drag {
                page,
                from,
                to,
                steps,
            } => {
                editor.poll_render_results();
                editor.drag(page, from, to, steps)?;
            }
            ScriptCommand::Export => reports.push(editor.export(writer).await?),
        }
    }
    Ok(reports)
}
