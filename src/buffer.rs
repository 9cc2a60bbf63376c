/// Fixed-capacity byte arena with a start/length window.
///
/// Valid bytes live at `data[start..start + len]`. The window only moves
/// through bounds-checked copies, so buffer slides (input restaging,
/// push-back) cannot run past either end of the allocation.
#[derive(Debug)]
pub struct Buffer {
    data: Box<[u8]>,
    start: usize,
    len: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new(0)
    }
}

impl Buffer {
    pub fn new(capacity: usize) -> Self {
        Buffer {
            data: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// The valid window.
    pub fn window(&self) -> &[u8] {
        &self.data[self.start..self.start + self.len]
    }

    /// Drop `n` bytes from the front of the window. Once the window empties
    /// the start snaps back to the base so the full capacity is writable.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.start += n;
        self.len -= n;
        if self.len == 0 {
            self.start = 0;
        }
    }

    /// Copy up to `dst.len()` bytes out of the front of the window,
    /// consuming them. Returns the number of bytes copied.
    pub fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.len);
        dst[..n].copy_from_slice(&self.data[self.start..self.start + n]);
        self.consume(n);
        n
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.len = 0;
    }

    /// Move the window to the base of the arena, making the free space one
    /// contiguous tail.
    pub fn slide_to_front(&mut self) {
        if self.start != 0 {
            self.data.copy_within(self.start..self.start + self.len, 0);
            self.start = 0;
        }
    }

    /// Free space following the window. Call [`Buffer::commit`] with the
    /// number of bytes actually written.
    pub fn space_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.start + self.len..]
    }

    pub fn commit(&mut self, n: usize) {
        debug_assert!(self.start + self.len + n <= self.data.len());
        self.len += n;
    }

    /// Append bytes to the window, which must fit in the free tail.
    pub fn extend(&mut self, src: &[u8]) {
        let at = self.start + self.len;
        self.data[at..at + src.len()].copy_from_slice(src);
        self.len += src.len();
    }

    /// Put one byte back in front of the window.
    ///
    /// An empty window places the byte at the very end of the arena, leaving
    /// maximum room for further push-backs. A window sitting at the base is
    /// slid to the end first. Fails when the arena is completely full.
    pub fn prepend(&mut self, byte: u8) -> bool {
        let cap = self.data.len();
        if self.len == 0 {
            self.start = cap - 1;
            self.data[self.start] = byte;
            self.len = 1;
            return true;
        }
        if self.len == cap {
            return false;
        }
        if self.start == 0 {
            self.data.copy_within(0..self.len, cap - self.len);
            self.start = cap - self.len;
        }
        self.start -= 1;
        self.data[self.start] = byte;
        self.len += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_consume() {
        let mut buf = Buffer::new(8);
        buf.extend(b"abcdef");
        assert_eq!(buf.window(), b"abcdef");
        buf.consume(2);
        assert_eq!(buf.window(), b"cdef");
        buf.consume(4);
        assert!(buf.is_empty());
        // start snapped back; the whole arena is free again
        assert_eq!(buf.space_mut().len(), 8);
    }

    #[test]
    fn test_read_into() {
        let mut buf = Buffer::new(8);
        buf.extend(b"hello");
        let mut dst = [0u8; 3];
        assert_eq!(buf.read_into(&mut dst), 3);
        assert_eq!(&dst, b"hel");
        assert_eq!(buf.window(), b"lo");
        let mut big = [0u8; 8];
        assert_eq!(buf.read_into(&mut big), 2);
        assert_eq!(&big[..2], b"lo");
    }

    #[test]
    fn test_slide_to_front() {
        let mut buf = Buffer::new(8);
        buf.extend(b"abcdef");
        buf.consume(4);
        buf.slide_to_front();
        assert_eq!(buf.window(), b"ef");
        assert_eq!(buf.space_mut().len(), 6);
        buf.extend(b"ghij");
        assert_eq!(buf.window(), b"efghij");
    }

    #[test]
    fn test_prepend_empty_goes_to_end() {
        let mut buf = Buffer::new(4);
        assert!(buf.prepend(b'x'));
        assert_eq!(buf.window(), b"x");
        // room for three more in front of it
        assert!(buf.prepend(b'c'));
        assert!(buf.prepend(b'b'));
        assert!(buf.prepend(b'a'));
        assert_eq!(buf.window(), b"abcx");
        assert!(!buf.prepend(b'!'));
    }

    #[test]
    fn test_prepend_slides_base_window() {
        let mut buf = Buffer::new(8);
        buf.extend(b"abc");
        // window starts at the base, so a push-back must slide it away first
        assert!(buf.prepend(b'z'));
        assert_eq!(buf.window(), b"zabc");
        let mut out = [0u8; 4];
        buf.read_into(&mut out);
        assert_eq!(&out, b"zabc");
    }

    #[test]
    fn test_commit_after_external_fill() {
        let mut buf = Buffer::new(8);
        let space = buf.space_mut();
        space[..3].copy_from_slice(b"xyz");
        buf.commit(3);
        assert_eq!(buf.window(), b"xyz");
    }
}
