use crate::{EstimateClose, EPS};
use nalgebra::DMatrix;

/// Bounding box in absolute pixel coordinates `(x1, y1, x2, y2)`, `x2 > x1`, `y2 > y1`.
///
#[derive(Clone, Default, Debug, Copy)]
pub struct BoundingBox {
    _x1: f32,
    _y1: f32,
    _x2: f32,
    _y2: f32,
}

impl BoundingBox {
    /// Constructor
    ///
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            _x1: x1,
            _y1: y1,
            _x2: x2,
            _y2: y2,
        }
    }

    pub fn x1(&self) -> f32 {
        self._x1
    }

    pub fn y1(&self) -> f32 {
        self._y1
    }

    pub fn x2(&self) -> f32 {
        self._x2
    }

    pub fn y2(&self) -> f32 {
        self._y2
    }

    pub fn width(&self) -> f32 {
        self._x2 - self._x1
    }

    pub fn height(&self) -> f32 {
        self._y2 - self._y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Centroid of the box, used for zone containment tests
    ///
    pub fn center(&self) -> (f32, f32) {
        ((self._x1 + self._x2) / 2.0, (self._y1 + self._y2) / 2.0)
    }

    /// The box is usable when all coordinates are finite and both extents are positive
    ///
    pub fn is_valid(&self) -> bool {
        self._x1.is_finite()
            && self._y1.is_finite()
            && self._x2.is_finite()
            && self._y2.is_finite()
            && self._x2 > self._x1
            && self._y2 > self._y1
    }

    pub fn as_xyah(&self) -> Xyah {
        Xyah::from(*self)
    }

    pub fn intersection(l: &BoundingBox, r: &BoundingBox) -> f32 {
        let (x1, y1) = (l._x1.max(r._x1), l._y1.max(r._y1));
        let (x2, y2) = (l._x2.min(r._x2), l._y2.min(r._y2));

        let int_width = x2 - x1;
        let int_height = y2 - y1;

        if int_width > 0.0 && int_height > 0.0 {
            int_width * int_height
        } else {
            0.0
        }
    }

    pub fn iou(l: &BoundingBox, r: &BoundingBox) -> f32 {
        let intersection = BoundingBox::intersection(l, r);
        let union = l.area() + r.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

impl EstimateClose for BoundingBox {
    /// Allows comparing bboxes
    ///
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self._x1 - other._x1).abs() < eps
            && (self._y1 - other._y1).abs() < eps
            && (self._x2 - other._x2).abs() < eps
            && (self._y2 - other._y2).abs() < eps
    }
}

impl PartialEq<Self> for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.almost_same(other, EPS)
    }
}

/// Measurement form of a box: `(center x, center y, aspect ratio, height)`.
///
/// This is the representation the Kalman filter works with.
///
#[derive(Clone, Default, Debug, Copy)]
pub struct Xyah {
    pub cx: f32,
    pub cy: f32,
    pub aspect: f32,
    pub height: f32,
}

impl Xyah {
    pub fn new(cx: f32, cy: f32, aspect: f32, height: f32) -> Self {
        Self {
            cx,
            cy,
            aspect,
            height,
        }
    }

    pub fn as_tlbr(&self) -> BoundingBox {
        let height = self.height.max(0.0);
        let width = self.aspect * height;
        BoundingBox::new(
            self.cx - width / 2.0,
            self.cy - height / 2.0,
            self.cx + width / 2.0,
            self.cy + height / 2.0,
        )
    }
}

impl From<BoundingBox> for Xyah {
    fn from(f: BoundingBox) -> Self {
        let (cx, cy) = f.center();
        let h = f.height();
        Xyah {
            cx,
            cy,
            // degenerate heights fall back to a square aspect
            aspect: if h > 0.0 { f.width() / h } else { 1.0 },
            height: h,
        }
    }
}

impl EstimateClose for Xyah {
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self.cx - other.cx).abs() < eps
            && (self.cy - other.cy).abs() < eps
            && (self.aspect - other.aspect).abs() < eps
            && (self.height - other.height).abs() < eps
    }
}

/// Pairwise IoU between track boxes (rows) and detection boxes (columns).
///
pub fn iou_matrix(tracks: &[BoundingBox], detections: &[BoundingBox]) -> DMatrix<f32> {
    let mut m = DMatrix::zeros(tracks.len(), detections.len());
    for (i, t) in tracks.iter().enumerate() {
        for (j, d) in detections.iter().enumerate() {
            m[(i, j)] = BoundingBox::iou(t, d);
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use crate::utils::bbox::{iou_matrix, BoundingBox, Xyah};
    use crate::{EstimateClose, EPS};

    #[test]
    fn xyah_conversion() {
        let bb = BoundingBox::new(100.0, 100.0, 150.0, 200.0);
        let m = bb.as_xyah();
        assert!(m.almost_same(&Xyah::new(125.0, 150.0, 0.5, 100.0), EPS));
        assert!(m.as_tlbr().almost_same(&bb, EPS));
    }

    #[test]
    fn degenerate_height_aspect() {
        let bb = BoundingBox::new(10.0, 10.0, 20.0, 10.0);
        assert!(!bb.is_valid());
        assert!((bb.as_xyah().aspect - 1.0).abs() < EPS);
    }

    #[test]
    fn validity() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!BoundingBox::new(1.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!BoundingBox::new(0.0, f32::NAN, 1.0, 1.0).is_valid());
        assert!(!BoundingBox::new(0.0, 0.0, f32::INFINITY, 1.0).is_valid());
    }

    #[test]
    fn iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((BoundingBox::iou(&a, &a) - 1.0).abs() < EPS);

        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!(BoundingBox::iou(&a, &b).abs() < EPS);

        // 50x100 boxes offset by half a width: intersection 25x100, union 7500
        let c = BoundingBox::new(0.0, 0.0, 50.0, 100.0);
        let d = BoundingBox::new(25.0, 0.0, 75.0, 100.0);
        assert!((BoundingBox::iou(&c, &d) - 2500.0 / 7500.0).abs() < EPS);
    }

    #[test]
    fn matrix() {
        let tracks = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(100.0, 100.0, 110.0, 110.0),
        ];
        let dets = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(100.0, 100.0, 110.0, 110.0),
            BoundingBox::new(500.0, 500.0, 510.0, 510.0),
        ];
        let m = iou_matrix(&tracks, &dets);
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);
        assert!((m[(0, 0)] - 1.0).abs() < EPS);
        assert!((m[(1, 1)] - 1.0).abs() < EPS);
        assert!(m[(0, 1)].abs() < EPS);
        assert!(m[(0, 2)].abs() < EPS);
    }
}
