use ndarray::Array2;

/// Axis-aligned bounding box in pixel coordinates.
///
/// Stored as TLWH (left, top, width, height). Right, bottom, center and area
/// are always derived from these four values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Box with its top-left corner at `(x, y)`.
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanning `(x1, y1)` to `(x2, y2)`.
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// `[left, top, right, bottom]`
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    /// `[left, top, width, height]`, the record layout.
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether `other` lies entirely inside this box (edges may touch).
    #[inline]
    pub fn contains(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Intersection over union.
    ///
    /// Two degenerate boxes with an empty union have an IoU of zero.
    pub fn iou(&self, other: &Rect) -> f32 {
        // f64 keeps edge sums exact, so a box against itself yields exactly 1.
        let [ax1, ay1, aw, ah] = self.to_tlwh().map(f64::from);
        let [bx1, by1, bw, bh] = other.to_tlwh().map(f64::from);

        let inter_width = ((ax1 + aw).min(bx1 + bw) - ax1.max(bx1)).max(0.0);
        let inter_height = ((ay1 + ah).min(by1 + bh) - ay1.max(by1)).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = aw * ah + bw * bh - inter_area;

        if union_area > 0.0 {
            (inter_area / union_area) as f32
        } else {
            0.0
        }
    }
}

/// Pairwise IoU, `ious[[i, j]] = boxes_a[i].iou(&boxes_b[j])`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}
