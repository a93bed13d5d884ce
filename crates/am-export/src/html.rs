//! Lecteur HTML autonome : `frames.js` (données) + une page statique.
//!
//! Format stable, sans version : `const fps = N;` puis `const frames = [...]`
//! où chaque entrée est un bloc de texte complet, lignes jointes par `\n`,
//! dans un template literal JavaScript.

use am_core::frame::AsciiFrame;

/// Nom du script chargé par la page.
pub const FRAMES_JS: &str = "frames.js";

/// Échappe ce qui casserait un template literal (`\`, `` ` ``, `$`).
///
/// # Example
/// ```
/// use am_export::html::escape_template;
/// assert_eq!(escape_template("a`b$c\\"), "a\\`b\\$c\\\\");
/// ```
#[must_use]
pub fn escape_template(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '`' | '$') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Génère le contenu de `frames.js`.
#[must_use]
pub fn build_frames_js(frames: &[AsciiFrame], fps: u32) -> String {
    let mut js = format!("const fps = {fps};\nconst frames = [\n");
    for frame in frames {
        js.push('`');
        js.push_str(&escape_template(&frame.text()));
        js.push_str("`,\n");
    }
    js.push_str("];\n");
    js
}

/// Page statique qui fait défiler `frames` à `1000 / fps` ms par frame.
#[must_use]
pub fn build_animation_html() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>ascii-mation</title>
  <style>
    * {{ margin: 0; padding: 0; box-sizing: border-box; }}
    body {{
      background: #0a0a0f;
      color: #d4d4d8;
      font-family: 'Courier New', monospace;
      display: flex;
      flex-direction: column;
      align-items: center;
      justify-content: center;
      min-height: 100vh;
      gap: 16px;
      padding: 24px;
    }}
    #ascii-art {{ white-space: pre; font-size: 12px; line-height: 1.2; }}
    .controls {{ display: flex; gap: 8px; align-items: center; }}
    button {{
      background: rgba(255,255,255,0.08);
      color: #d4d4d8;
      border: 1px solid rgba(255,255,255,0.15);
      padding: 6px 16px;
      border-radius: 6px;
      cursor: pointer;
      font-family: inherit;
      font-size: 12px;
    }}
    .info {{ color: #71717a; font-size: 11px; }}
  </style>
</head>
<body>
  <pre id="ascii-art"></pre>
  <div class="controls">
    <button id="playBtn">play</button>
    <span class="info" id="frameInfo">0 / 0</span>
  </div>
  <script src="{FRAMES_JS}"></script>
  <script>
    let playing = false;
    let current = 0;
    let timer;
    const art = document.getElementById('ascii-art');
    const btn = document.getElementById('playBtn');
    const info = document.getElementById('frameInfo');

    function show(i) {{
      art.textContent = frames[i];
      info.textContent = (i + 1) + ' / ' + frames.length;
    }}

    btn.addEventListener('click', function () {{
      if (playing) {{
        clearInterval(timer);
        btn.textContent = 'play';
      }} else {{
        timer = setInterval(function () {{
          current = (current + 1) % frames.length;
          show(current);
        }}, 1000 / fps);
        btn.textContent = 'pause';
      }}
      playing = !playing;
    }});

    if (frames.length > 0) show(0);
  </script>
</body>
</html>
"#
    )
}
