//! Container resource requests and limits as numbers.

use serde::Serialize;
use serde_json::Value;

use crate::{
	paths::{CPU, LIMITS, MEMORY, REQUESTS},
	quantity::{resource_value, GIBS},
};

/// CPU in cores and memory in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourcePair {
	pub cpu: Option<f64>,
	pub memory: Option<f64>,
}

/// Normalized `resources` block of a single container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerResources {
	pub limits: ResourcePair,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub requests: Option<ResourcePair>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
	Limits,
	Requests,
}

impl ResourceKind {
	pub fn as_str(self) -> &'static str {
		match self {
			ResourceKind::Limits => LIMITS,
			ResourceKind::Requests => REQUESTS,
		}
	}
}

fn round_to(value: f64, digits: i32) -> f64 {
	let factor = 10f64.powi(digits);
	(value * factor).round() / factor
}

fn pair(resources: &Value, key: &str, multiply_cpu: f64, multiply_mem: f64) -> ResourcePair {
	let section = resources.get(key);
	let value_of = |name: &str| section.and_then(|s| s.get(name)).and_then(resource_value);
	ResourcePair {
		cpu: value_of(CPU).map(|v| round_to(v * multiply_cpu, 1)),
		memory: value_of(MEMORY).map(|v| round_to(v * multiply_mem, 0)),
	}
}

impl ContainerResources {
	/// Normalize a manifest `resources` object, scaling cpu and memory by the given factors.
	///
	/// Requests are only reported when the source declares them.
	pub fn normalize(resources: &Value, multiply_cpu: f64, multiply_mem: f64) -> Self {
		let requests = resources
			.get(REQUESTS)
			.map(|_| pair(resources, REQUESTS, multiply_cpu, multiply_mem));
		Self {
			limits: pair(resources, LIMITS, multiply_cpu, multiply_mem),
			requests,
		}
	}

	pub fn get(&self, kind: ResourceKind) -> Option<&ResourcePair> {
		match kind {
			ResourceKind::Limits => Some(&self.limits),
			ResourceKind::Requests => self.requests.as_ref(),
		}
	}

	/// Back to a `resources` shaped JSON object, dropping unknown values.
	pub fn to_value(&self) -> Value {
		let pair_value = |p: &ResourcePair| {
			let mut map = serde_json::Map::new();
			if let Some(cpu) = p.cpu {
				map.insert(CPU.to_string(), cpu.into());
			}
			if let Some(memory) = p.memory {
				map.insert(MEMORY.to_string(), memory.into());
			}
			Value::Object(map)
		};
		let mut map = serde_json::Map::new();
		if let Some(requests) = &self.requests {
			map.insert(REQUESTS.to_string(), pair_value(requests));
		}
		map.insert(LIMITS.to_string(), pair_value(&self.limits));
		Value::Object(map)
	}
}

/// Sum of cpu and memory over a set of containers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
	pub kind: &'static str,
	pub items: usize,
	/// Containers without this kind of resources
	pub missing: usize,
	pub cpu: f64,
	pub memory_gib: f64,
}

impl Totals {
	pub fn of(resources: &[ContainerResources], kind: ResourceKind) -> Self {
		let mut cpu = 0.0;
		let mut memory = 0.0;
		let mut missing = 0;
		for pair in resources.iter().map(|r| r.get(kind)) {
			match pair {
				Some(p) => {
					cpu += p.cpu.unwrap_or_default();
					memory += p.memory.unwrap_or_default();
				}
				None => missing += 1,
			}
		}
		Self {
			kind: kind.as_str(),
			items: resources.len(),
			missing,
			cpu: round_to(cpu, 1),
			memory_gib: round_to(memory / GIBS, 1),
		}
	}
}
