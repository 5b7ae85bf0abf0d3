use http::Method;
use micro_dispatch::HttpContext;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    request: TestRequest,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, request: TestRequest) -> Self {
        Self { name, group, request }
    }

    /// Handlers that bind from the route, query or headers only.
    pub fn immediate(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Immediate, request)
    }

    /// Handlers that read the request body.
    pub fn body_aware(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::BodyAware, request)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn request(&self) -> &TestRequest {
        &self.request
    }
}

/// A request fixture, turned into a fresh [`HttpContext`] for every iteration.
#[derive(Debug, Copy, Clone)]
pub struct TestRequest {
    uri: &'static str,
    route_values: &'static [(&'static str, &'static str)],
    body: Option<&'static str>,
}

impl TestRequest {
    pub const fn get(uri: &'static str, route_values: &'static [(&'static str, &'static str)]) -> Self {
        Self { uri, route_values, body: None }
    }

    pub const fn post(uri: &'static str, body: &'static str) -> Self {
        Self { uri, route_values: &[], body: Some(body) }
    }

    pub fn body_len(&self) -> usize {
        self.body.map_or(0, str::len)
    }

    pub fn to_context(&self) -> HttpContext {
        let method = if self.body.is_some() { Method::POST } else { Method::GET };
        let mut builder = HttpContext::builder().method(method).uri(self.uri);
        for (name, value) in self.route_values {
            builder = builder.route_value(*name, *value);
        }
        if let Some(body) = self.body {
            builder = builder.body(body);
        }
        builder.build().expect("fixture should be a valid request")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestGroup {
    Immediate,
    BodyAware,
}
