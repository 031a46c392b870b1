//! Container resources of rendered manifests and `kubectl get -o yaml` lists.

use std::{
	collections::BTreeMap,
	fmt,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use k8s::{
	paths::{
		APPLICATION_PROPERTIES, KIND, METADATA_NAME, NAME, POD_CONTAINERS, POD_INIT_CONTAINERS, REPLICAS, RESOURCES,
		SERVICE_NAME, STORAGE_REQUEST, TEMPLATE_CONTAINERS, TEMPLATE_INIT_CONTAINERS, VOLUME_CLAIM_TEMPLATES,
	},
	ContainerResources, ResourceKind, Totals,
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{docpath, flatten::leaf_text, report::{fmt_number, Table}, yaml};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ManifestType {
	/// `kubectl get pod -o yaml`
	Pod,
	/// `kubectl get deploy -o yaml`
	Deploy,
	/// `kubectl get job -o yaml`
	Job,
	/// Multi-document manifest, e.g. `helm template` or `helm get manifest`
	Manifest,
}

impl fmt::Display for ManifestType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ManifestType::Pod => "pod",
			ManifestType::Deploy => "deploy",
			ManifestType::Job => "job",
			ManifestType::Manifest => "manifest",
		})
	}
}

/// Raw `resources` of a named container
#[derive(Debug, Clone, PartialEq)]
pub struct NamedResources {
	pub name: String,
	pub resources: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedNormalized {
	pub name: String,
	pub resources: ContainerResources,
}

pub struct ManifestAnalysis {
	pub manifest_type: ManifestType,
	pub docs: Vec<Value>,
}

impl ManifestAnalysis {
	#[instrument(skip_all, fields(path = %path.display(), manifest_type = %manifest_type))]
	pub fn load(path: &Path, manifest_type: ManifestType) -> Result<Self> {
		let docs = yaml::load_all(path)?;
		Self::from_docs(docs, manifest_type).with_context(|| format!("failed to analyse {}", path.display()))
	}

	/// Lists (`kind: PodList`, ...) are unpacked for every type but [`ManifestType::Manifest`].
	pub fn from_docs(docs: Vec<Value>, manifest_type: ManifestType) -> Result<Self> {
		let docs = if manifest_type == ManifestType::Manifest {
			docs
		} else {
			let first = docs.into_iter().next().context("empty document list")?;
			match first.get("items") {
				Some(Value::Array(items)) => items.clone(),
				_ => anyhow::bail!("expected a list with `items` for {manifest_type}"),
			}
		};
		Ok(Self { manifest_type, docs })
	}

	/// Documents carrying a `kind`
	pub fn kind_docs(&self) -> impl Iterator<Item = &Value> {
		kind_docs(&self.docs)
	}

	pub fn replicas(&self) -> Vec<Option<&Value>> {
		self.docs.iter().map(|doc| docpath::get(doc, REPLICAS)).collect()
	}

	fn container_paths(&self) -> [&'static str; 2] {
		if self.manifest_type == ManifestType::Pod {
			[POD_CONTAINERS, POD_INIT_CONTAINERS]
		} else {
			[TEMPLATE_CONTAINERS, TEMPLATE_INIT_CONTAINERS]
		}
	}

	/// Containers of every document first, init containers after them
	pub fn container_resources(&self) -> Vec<NamedResources> {
		let mut out = Vec::new();
		for path in self.container_paths() {
			for doc in &self.docs {
				let Some(Value::Array(containers)) = docpath::get(doc, path) else {
					continue;
				};
				for container in containers {
					let Some(name) = container.get(NAME).and_then(Value::as_str) else {
						warn!("skipping container without a name in {path}");
						continue;
					};
					out.push(NamedResources {
						name: name.to_string(),
						resources: container.get(RESOURCES).cloned().unwrap_or_else(|| Value::Object(Default::default())),
					});
				}
			}
		}
		out
	}

	/// Normalized resources. Without `linkerd` the proxy containers are left out.
	pub fn extract_resources(&self, linkerd: bool) -> Vec<NamedNormalized> {
		self.container_resources()
			.into_iter()
			.filter(|c| linkerd || !c.name.contains("linkerd"))
			.map(|c| NamedNormalized {
				resources: ContainerResources::normalize(&c.resources, 1.0, 1.0),
				name: c.name,
			})
			.collect()
	}

	pub fn extract_volumes(&self) -> BTreeMap<String, Value> {
		extract_volumes(&self.docs)
	}

	pub fn extract_properties(&self) -> BTreeMap<String, Value> {
		extract_properties(&self.docs)
	}
}

pub fn kind_docs(docs: &[Value]) -> impl Iterator<Item = &Value> {
	docs.iter().filter(|doc| doc.get(KIND).is_some())
}

/// Storage request of StatefulSets with a single volume claim template, by service name
pub fn extract_volumes(docs: &[Value]) -> BTreeMap<String, Value> {
	let mut out = BTreeMap::new();
	for doc in kind_docs(docs) {
		debug!("processing doc kind: {}", doc[KIND]);
		let Some(Value::Array(templates)) = docpath::get(doc, VOLUME_CLAIM_TEMPLATES) else {
			continue;
		};
		let [template] = templates.as_slice() else {
			continue;
		};
		let Some(service) = docpath::get(doc, SERVICE_NAME) else {
			debug!("volume claim template without a service name");
			continue;
		};
		let storage = docpath::get(template, STORAGE_REQUEST).cloned().unwrap_or(Value::Null);
		out.insert(leaf_text(service), storage);
	}
	out
}

/// `application.properties` of every ConfigMap, by ConfigMap name
pub fn extract_properties(docs: &[Value]) -> BTreeMap<String, Value> {
	kind_docs(docs)
		.filter(|doc| doc[KIND] == "ConfigMap")
		.map(|cm| {
			let name = docpath::get(cm, METADATA_NAME).map_or_else(|| "None".to_string(), leaf_text);
			let props = docpath::get(cm, APPLICATION_PROPERTIES).cloned().unwrap_or(Value::Null);
			(name, props)
		})
		.collect()
}

fn cell(value: Option<f64>) -> String {
	value.map_or_else(|| "None".to_string(), fmt_number)
}

/// One row per container, sorted by name
pub fn resources_table(resources: &[NamedNormalized]) -> Table {
	let mut table = Table::new(["name", "limits cpu", "limits memory", "requests cpu", "requests memory"]);
	let mut sorted: Vec<&NamedNormalized> = resources.iter().collect();
	sorted.sort_by(|a, b| a.name.cmp(&b.name));
	for item in sorted {
		let requests = item.resources.requests.unwrap_or_default();
		table.push([
			item.name.clone(),
			cell(item.resources.limits.cpu),
			cell(item.resources.limits.memory),
			cell(requests.cpu),
			cell(requests.memory),
		]);
	}
	table
}

pub fn totals_table(resources: &[NamedNormalized]) -> Table {
	let normalized: Vec<ContainerResources> = resources.iter().map(|r| r.resources.clone()).collect();
	let mut table = Table::new(["kind", "items", "missing", "cpu", "memory [Gi]"]);
	for kind in [ResourceKind::Limits, ResourceKind::Requests] {
		let totals = Totals::of(&normalized, kind);
		table.push([
			totals.kind.to_string(),
			totals.items.to_string(),
			totals.missing.to_string(),
			fmt_number(totals.cpu),
			fmt_number(totals.memory_gib),
		]);
	}
	table
}

/// `<dir>/<stem>_<type>_linkerd_<bool>.html` next to the analysed file
pub fn report_path(file: &Path, manifest_type: ManifestType, linkerd: bool) -> PathBuf {
	let stem = bare_file_name(file);
	file.with_file_name(format!("{stem}_{manifest_type}_linkerd_{linkerd}.html"))
}

/// File name without a trailing `.yaml`
pub fn bare_file_name(file: &Path) -> String {
	let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
	name.strip_suffix(".yaml").map(str::to_string).unwrap_or(name)
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use k8s::GIBS;
	use serde_json::json;

	use super::*;

	const PODS: &str = indoc! {"
		apiVersion: v1
		kind: List
		items:
		  - kind: Pod
		    metadata:
		      name: dpm-0
		    spec:
		      initContainers:
		        - name: wait
		          resources:
		            limits: {cpu: 100m, memory: 64Mi}
		      containers:
		        - name: dpm
		          resources:
		            limits: {cpu: '2', memory: 4Gi}
		            requests: {cpu: 500m, memory: 2Gi}
		        - name: linkerd-proxy
		          resources:
		            limits: {memory: 250Mi}
	"};

	fn pods() -> ManifestAnalysis {
		ManifestAnalysis::from_docs(yaml::load_all_str(PODS).unwrap(), ManifestType::Pod).unwrap()
	}

	#[test]
	fn test_pod_list_containers_then_init_containers() {
		let names: Vec<String> = pods().container_resources().into_iter().map(|c| c.name).collect();
		assert_eq!(names, ["dpm", "linkerd-proxy", "wait"]);
	}

	#[test]
	fn test_extract_resources_without_linkerd() {
		let resources = pods().extract_resources(false);
		assert_eq!(resources.len(), 2);
		assert_eq!(resources[0].name, "dpm");
		assert_eq!(resources[0].resources.limits.cpu, Some(2.0));
		assert_eq!(resources[0].resources.limits.memory, Some(4.0 * GIBS));
		assert_eq!(resources[1].resources.requests, None);
		assert_eq!(pods().extract_resources(true).len(), 3);
	}

	#[test]
	fn test_list_types_need_items() {
		let err = ManifestAnalysis::from_docs(vec![json!({"kind": "Pod"})], ManifestType::Deploy).err();
		assert!(err.is_some());
	}

	#[test]
	fn test_deployments_use_template_containers() {
		let docs = vec![json!({"items": [{
			"kind": "Deployment",
			"spec": {"replicas": 2, "template": {"spec": {"containers": [{"name": "mmm-be", "resources": {}}]}}}
		}]})];
		let analysis = ManifestAnalysis::from_docs(docs, ManifestType::Deploy).unwrap();
		assert_eq!(analysis.container_resources()[0].name, "mmm-be");
		assert_eq!(analysis.replicas(), vec![Some(&json!(2))]);
	}

	#[test]
	fn test_volumes_and_properties() {
		let docs = yaml::load_all_str(indoc! {"
			kind: StatefulSet
			spec:
			  serviceName: minio
			  volumeClaimTemplates:
			    - spec:
			        resources:
			          requests:
			            storage: 10Gi
			---
			kind: ConfigMap
			metadata:
			  name: dpm-config
			data:
			  application.properties: |
			    a=1
		"})
		.unwrap();
		assert_eq!(extract_volumes(&docs), BTreeMap::from([("minio".to_string(), json!("10Gi"))]));
		assert_eq!(extract_properties(&docs), BTreeMap::from([("dpm-config".to_string(), json!("a=1\n"))]));
	}

	#[test]
	fn test_totals_table() {
		let table = totals_table(&pods().extract_resources(false));
		assert_eq!(table.rows[0], ["limits", "2", "0", "2.1", "4.1"]);
		assert_eq!(table.rows[1], ["requests", "2", "1", "0.5", "2"]);
	}

	#[test]
	fn test_report_path() {
		let path = report_path(Path::new("/tmp/out/pods.yaml"), ManifestType::Pod, false);
		assert_eq!(path, PathBuf::from("/tmp/out/pods_pod_linkerd_false.html"));
	}
}
