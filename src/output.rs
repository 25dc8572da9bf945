use anyhow::Result;
use proctor_eyes::types::Frame;

/// The display window. 'q' asks to quit.
pub struct WindowOutput {
    window: minifb::Window,
    buffer: Vec<u32>,
}

impl WindowOutput {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = minifb::Window::new(
            title,
            width,
            height,
            minifb::WindowOptions {
                resize: true,
                ..minifb::WindowOptions::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("Failed to create window: {}", e))?;

        window.set_target_fps(60);

        Ok(Self {
            window,
            buffer: vec![0; width * height],
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn quit_requested(&self) -> bool {
        self.window.is_key_down(minifb::Key::Q)
    }

    /// Draws a frame, converting RGB8 to 0RGB u32.
    pub fn show(&mut self, frame: &Frame) -> Result<()> {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        self.buffer.resize(w * h, 0);
        for (dst, p) in self.buffer.iter_mut().zip(frame.pixels()) {
            *dst = ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32;
        }
        self.window
            .update_with_buffer(&self.buffer, w, h)
            .map_err(|e| anyhow::anyhow!("Window update failed: {}", e))
    }

    /// Keeps input flowing on frames where nothing is drawn.
    pub fn poll(&mut self) {
        self.window.update();
    }
}
