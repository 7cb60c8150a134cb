//! Streaming byte-sink abstraction, ported from the teacher's
//! `warg-crypto::visit_bytes`, used to build domain-separated digests from
//! tuples of prefixes and nested hashes without materializing a `Vec<u8>`.

pub trait ByteVisitor {
    fn visit_bytes(&mut self, bytes: impl AsRef<[u8]>);

    fn visit_nested(&mut self, nested: impl VisitBytes) {
        nested.visit(self)
    }
}

impl<'a, BV: ?Sized + ByteVisitor> ByteVisitor for &'a mut BV {
    fn visit_bytes(&mut self, bytes: impl AsRef<[u8]>) {
        (self as &mut BV).visit_bytes(bytes)
    }
}

pub trait VisitBytes {
    fn visit<BV: ?Sized + ByteVisitor>(&self, visitor: &mut BV);
}

impl<'a, VB: ?Sized + VisitBytes> VisitBytes for &'a VB {
    fn visit<BV: ?Sized + ByteVisitor>(&self, visitor: &mut BV) {
        (self as &VB).visit(visitor)
    }
}

impl VisitBytes for u8 {
    fn visit<BV: ?Sized + ByteVisitor>(&self, visitor: &mut BV) {
        visitor.visit_bytes([*self]);
    }
}

impl<'a> VisitBytes for &'a [u8] {
    fn visit<BV: ?Sized + ByteVisitor>(&self, visitor: &mut BV) {
        visitor.visit_bytes(self);
    }
}

impl<'a> VisitBytes for &'a str {
    fn visit<BV: ?Sized + ByteVisitor>(&self, visitor: &mut BV) {
        visitor.visit_bytes(self.as_bytes());
    }
}

impl VisitBytes for () {
    fn visit<BV: ?Sized + ByteVisitor>(&self, _visitor: &mut BV) {}
}

impl<T1, T2> VisitBytes for (T1, T2)
where
    T1: VisitBytes,
    T2: VisitBytes,
{
    fn visit<BV: ?Sized + ByteVisitor>(&self, visitor: &mut BV) {
        self.0.visit(visitor);
        self.1.visit(visitor);
    }
}

impl<T1, T2, T3> VisitBytes for (T1, T2, T3)
where
    T1: VisitBytes,
    T2: VisitBytes,
    T3: VisitBytes,
{
    fn visit<BV: ?Sized + ByteVisitor>(&self, visitor: &mut BV) {
        self.0.visit(visitor);
        self.1.visit(visitor);
        self.2.visit(visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collector(Vec<u8>);
    impl ByteVisitor for Collector {
        fn visit_bytes(&mut self, bytes: impl AsRef<[u8]>) {
            self.0.extend_from_slice(bytes.as_ref());
        }
    }

    #[test]
    fn empty_slices_have_no_impact() {
        let empty: &[u8] = &[];
        let mut a = Collector(Vec::new());
        (0u8, 1u8).visit(&mut a);
        let mut b = Collector(Vec::new());
        (0u8, empty, 1u8).visit(&mut b);
        assert_eq!(a.0, b.0);
    }
}
