//! Physical key codes and logical key names
//!
//! Maps macOS virtual keycodes (ANSI layout) to DOM-style `code` names,
//! and derives the logical `key` a US layout produces for a code.

/// DOM `code` for a macOS virtual keycode
pub fn code_for_mac_keycode(keycode: u16) -> Option<&'static str> {
    let code = match keycode {
        0x00 => "KeyA",
        0x01 => "KeyS",
        0x02 => "KeyD",
        0x03 => "KeyF",
        0x04 => "KeyH",
        0x05 => "KeyG",
        0x06 => "KeyZ",
        0x07 => "KeyX",
        0x08 => "KeyC",
        0x09 => "KeyV",
        0x0B => "KeyB",
        0x0C => "KeyQ",
        0x0D => "KeyW",
        0x0E => "KeyE",
        0x0F => "KeyR",
        0x10 => "KeyY",
        0x11 => "KeyT",
        0x12 => "Digit1",
        0x13 => "Digit2",
        0x14 => "Digit3",
        0x15 => "Digit4",
        0x16 => "Digit6",
        0x17 => "Digit5",
        0x18 => "Equal",
        0x19 => "Digit9",
        0x1A => "Digit7",
        0x1B => "Minus",
        0x1C => "Digit8",
        0x1D => "Digit0",
        0x1E => "BracketRight",
        0x1F => "KeyO",
        0x20 => "KeyU",
        0x21 => "BracketLeft",
        0x22 => "KeyI",
        0x23 => "KeyP",
        0x24 => "Enter",
        0x25 => "KeyL",
        0x26 => "KeyJ",
        0x27 => "Quote",
        0x28 => "KeyK",
        0x29 => "Semicolon",
        0x2A => "Backslash",
        0x2B => "Comma",
        0x2C => "Slash",
        0x2D => "KeyN",
        0x2E => "KeyM",
        0x2F => "Period",
        0x30 => "Tab",
        0x31 => "Space",
        0x32 => "Backquote",
        0x33 => "Backspace",
        0x35 => "Escape",
        0x60 => "F5",
        0x61 => "F6",
        0x62 => "F7",
        0x63 => "F3",
        0x64 => "F8",
        0x65 => "F9",
        0x67 => "F11",
        0x6D => "F10",
        0x6F => "F12",
        0x73 => "Home",
        0x74 => "PageUp",
        0x75 => "Delete",
        0x76 => "F4",
        0x77 => "End",
        0x78 => "F2",
        0x79 => "PageDown",
        0x7A => "F1",
        0x7B => "ArrowLeft",
        0x7C => "ArrowRight",
        0x7D => "ArrowDown",
        0x7E => "ArrowUp",
        _ => return None,
    };
    Some(code)
}

/// Logical key a US layout produces for `code`
pub fn key_for_code(code: &str, shift: bool) -> Option<String> {
    if let Some(letter) = code.strip_prefix("Key") {
        let mut chars = letter.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            let c = if shift {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            return Some(c.to_string());
        }
        return None;
    }

    if let Some(digit) = code.strip_prefix("Digit") {
        let d = digit.parse::<usize>().ok().filter(|d| *d < 10)?;
        if shift {
            return ")!@#$%^&*(".chars().nth(d).map(String::from);
        }
        return Some(digit.to_string());
    }

    let (plain, shifted) = match code {
        "Minus" => ("-", "_"),
        "Equal" => ("=", "+"),
        "BracketLeft" => ("[", "{"),
        "BracketRight" => ("]", "}"),
        "Backslash" => ("\\", "|"),
        "Semicolon" => (";", ":"),
        "Quote" => ("'", "\""),
        "Comma" => (",", "<"),
        "Period" => (".", ">"),
        "Slash" => ("/", "?"),
        "Backquote" => ("`", "~"),
        "Space" => (" ", " "),
        // Named keys keep their name regardless of shift
        "Enter" | "Tab" | "Backspace" | "Escape" | "Delete" | "Home" | "End" | "PageUp"
        | "PageDown" | "ArrowLeft" | "ArrowRight" | "ArrowUp" | "ArrowDown" => {
            return Some(code.to_string())
        }
        _ if is_function_key(code) => return Some(code.to_string()),
        _ => return None,
    };
    Some(if shift { shifted } else { plain }.to_string())
}

fn is_function_key(code: &str) -> bool {
    code.strip_prefix('F')
        .and_then(|n| n.parse::<u8>().ok())
        .map_or(false, |n| (1..=24).contains(&n))
}
