use am_core::frame::AsciiFrame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;

/// Fond des surfaces de rendu (#0a0a0f).
pub const BG_COLOR: Color = Color::Rgb(0x0a, 0x0a, 0x0f);
/// Premier plan monochrome (#d4d4d8).
pub const FG_COLOR: Color = Color::Rgb(0xd4, 0xd4, 0xd8);

/// Zone occupée par la grille, centrée dans `area` et bornée à celle-ci.
///
/// # Example
/// ```
/// use am_render::canvas::centered;
/// use ratatui::layout::Rect;
/// assert_eq!(centered(Rect::new(0, 0, 10, 6), 4, 2), Rect::new(3, 2, 4, 2));
/// assert_eq!(centered(Rect::new(0, 0, 3, 3), 8, 8), Rect::new(0, 0, 3, 3));
/// ```
#[must_use]
pub fn centered(area: Rect, cols: usize, rows: usize) -> Rect {
    let w = u16::try_from(cols).unwrap_or(u16::MAX).min(area.width);
    let h = u16::try_from(rows).unwrap_or(u16::MAX).min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

/// Écrit directement une `AsciiFrame` dans un `ratatui::Buffer`.
///
/// Pas de widget Canvas ratatui : écriture directe dans le buffer.
/// La grille est centrée ; ce qui dépasse de `area` est coupé.
/// En couleur, chaque cellule prend sa couleur RGB ; sinon `FG_COLOR`.
pub fn render_frame(buf: &mut Buffer, area: Rect, frame: &AsciiFrame, color_enabled: bool) {
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(' ').set_bg(BG_COLOR).set_fg(FG_COLOR);
            }
        }
    }
    if frame.cols() == 0 || frame.rows() == 0 {
        return;
    }

    let target = centered(area, frame.cols(), frame.rows());
    // Recadrage centré quand la grille dépasse le terminal.
    let skip_x = (frame.cols() - usize::from(target.width)) / 2;
    let skip_y = (frame.rows() - usize::from(target.height)) / 2;

    for (dy, line) in frame
        .lines()
        .iter()
        .skip(skip_y)
        .take(usize::from(target.height))
        .enumerate()
    {
        let gy = skip_y + dy;
        for (dx, ch) in line
            .chars()
            .skip(skip_x)
            .take(usize::from(target.width))
            .enumerate()
        {
            let gx = skip_x + dx;
            let pos = (target.x + dx as u16, target.y + dy as u16);
            if let Some(cell) = buf.cell_mut(pos) {
                cell.set_char(ch);
                if color_enabled {
                    let [r, g, b] = frame.rgb_at(gx, gy);
                    cell.set_fg(Color::Rgb(r, g, b));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use am_core::frame::ColorGrid;

    fn sample() -> AsciiFrame {
        let mut colors = ColorGrid::new(2, 2);
        colors.set_rgb(3, [9, 8, 7]);
        AsciiFrame::new(vec!["ab".into(), "cd".into()], colors)
    }

    #[test]
    fn grid_is_centered() {
        let area = Rect::new(0, 0, 6, 4);
        let mut buf = Buffer::empty(area);
        render_frame(&mut buf, area, &sample(), false);
        assert_eq!(buf[(2, 1)].symbol(), "a");
        assert_eq!(buf[(3, 2)].symbol(), "d");
        assert_eq!(buf[(0, 0)].symbol(), " ");
        assert_eq!(buf[(2, 1)].fg, FG_COLOR);
        assert_eq!(buf[(0, 0)].bg, BG_COLOR);
    }

    #[test]
    fn color_mode_uses_cell_colors() {
        let area = Rect::new(0, 0, 2, 2);
        let mut buf = Buffer::empty(area);
        render_frame(&mut buf, area, &sample(), true);
        assert_eq!(buf[(1, 1)].fg, Color::Rgb(9, 8, 7));
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn oversized_grid_is_cropped_around_center() {
        let lines = vec!["abcde".to_string(); 3];
        let frame = AsciiFrame::new(lines, ColorGrid::new(5, 3));
        let area = Rect::new(0, 0, 3, 1);
        let mut buf = Buffer::empty(area);
        render_frame(&mut buf, area, &frame, false);
        assert_eq!(buf[(0, 0)].symbol(), "b");
        assert_eq!(buf[(2, 0)].symbol(), "d");
    }
}
