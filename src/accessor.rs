use std::sync::Arc;

/// How a binding reads, and optionally writes, the value it observes on a host object.
///
/// An accessor is a tagged choice: a *key-path* accessor carries a setter and can
/// serve as a relay destination, a *selector* accessor is a zero-argument getter and is
/// read-only. Both sides are plain closures, so an accessor that does not resolve on the
/// host type is unrepresentable - the compiler rejects it at the bind site. The engine
/// never branches on which kind it holds; it only asks [`Accessor::is_writable`].
pub struct Accessor<O: ?Sized, T> {
    name: &'static str,
    get: Arc<dyn Fn(&O) -> T + Send + Sync>,
    set: Option<Arc<dyn Fn(&mut O, T) + Send + Sync>>,
}

impl<O: ?Sized, T> Clone for Accessor<O, T> {
    fn clone(&self) -> Self { Self { name: self.name, get: self.get.clone(), set: self.set.clone() } }
}

impl<O: ?Sized, T> std::fmt::Debug for Accessor<O, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor").field("name", &self.name).field("writable", &self.is_writable()).finish()
    }
}

impl<O: ?Sized, T> Accessor<O, T> {
    /// Read+write accessor over a named property.
    ///
    /// ```
    /// # use tether::Accessor;
    /// struct Contact { name: String }
    /// let name = Accessor::key_path("name", |c: &Contact| c.name.clone(), |c, v| c.name = v);
    /// assert!(name.is_writable());
    /// ```
    pub fn key_path(
        name: &'static str,
        get: impl Fn(&O) -> T + Send + Sync + 'static,
        set: impl Fn(&mut O, T) + Send + Sync + 'static,
    ) -> Self {
        Self { name, get: Arc::new(get), set: Some(Arc::new(set)) }
    }

    /// Read-only accessor over a zero-argument getter.
    ///
    /// Valid as an observation source; a relay write through it fails with
    /// [`PropagationError::ReadOnly`](crate::PropagationError::ReadOnly) at propagation time.
    pub fn selector(name: &'static str, get: impl Fn(&O) -> T + Send + Sync + 'static) -> Self {
        Self { name, get: Arc::new(get), set: None }
    }

    /// Diagnostic label carried into logs and errors
    pub fn name(&self) -> &'static str { self.name }

    /// Whether this accessor can serve as a relay destination
    pub fn is_writable(&self) -> bool { self.set.is_some() }

    pub(crate) fn getter(&self) -> Arc<dyn Fn(&O) -> T + Send + Sync> { self.get.clone() }

    pub(crate) fn setter(&self) -> Option<Arc<dyn Fn(&mut O, T) + Send + Sync>> { self.set.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i32,
    }

    #[test]
    fn key_path_reads_and_writes() {
        let x = Accessor::key_path("x", |p: &Point| p.x, |p, v| p.x = v);
        let mut point = Point { x: 1 };
        assert_eq!((x.getter())(&point), 1);
        (x.setter().unwrap())(&mut point, 5);
        assert_eq!(point.x, 5);
    }

    #[test]
    fn selector_has_no_setter() {
        let x = Accessor::selector("x", |p: &Point| p.x);
        assert!(!x.is_writable());
        assert!(x.setter().is_none());
        assert_eq!(x.name(), "x");
    }
}
